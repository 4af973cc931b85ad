//! Tests for loaded library enumeration

use std::path::Path;

use snapcore_core::api;
use snapcore_core::libraries::{find_libraries, LibraryEnumerator, NativeEnumerator};

#[cfg(any(target_os = "linux", target_os = "macos"))]
#[test]
fn test_find_libraries_is_not_empty()
{
    assert!(!find_libraries().is_empty());
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
#[test]
fn test_find_libraries_includes_running_executable()
{
    let exe = std::env::current_exe().unwrap().canonicalize().unwrap();
    let libraries = find_libraries();

    let found = libraries
        .iter()
        .filter_map(|library| Path::new(library).canonicalize().ok())
        .any(|path| path == exe);
    assert!(found, "{} not in {libraries:?}", exe.display());
}

// glibc reports the main program first, without a name
#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn test_linux_lists_executable_first()
{
    let exe = std::env::current_exe().unwrap();
    let libraries = find_libraries();
    assert_eq!(Path::new(&libraries[0]), exe.as_path());
}

#[test]
fn test_boundary_matches_native_enumerator()
{
    assert_eq!(api::find_libraries(), NativeEnumerator::default().loaded_libraries());
}

#[test]
fn test_enumeration_is_fresh_each_call()
{
    // Nothing is loaded or unloaded in between, so two walks agree
    assert_eq!(find_libraries(), find_libraries());
}
