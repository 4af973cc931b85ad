//! Build script for snapcore-core
//!
//! Checks the toolchain and tells the builder when the target has no
//! process support (dump operations compile to stubs there).
//!
//! ## Requirements
//!
//! - **Rust**: Edition 2021 (Rust 1.56.0 or newer)
//! - **Linux / macOS**: full support
//! - **Windows**: stubs only

use std::env;

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    // Edition 2021 requires Rust 1.56.0
    match rustc_version::version() {
        Ok(found) => {
            let min_rust_version = rustc_version::Version::new(1, 56, 0);
            if found < min_rust_version {
                panic!("snapcore-core requires Rust {min_rust_version} or newer (Edition 2021), found {found}");
            }
        }
        Err(_) => println!("cargo:warning=could not verify Rust version"),
    }

    // Build scripts run on the host, so look at the target through cargo's cfg variables
    let family = env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    if !family.split(',').any(|f| f == "unix") {
        let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
        println!("cargo:warning=snapcore-core: target `{os}` has no fork/core support, dump operations are stubs");
    }
}
