//! Common module for library exports

pub use crate::error::{CoreError, CoreResult};
pub use crate::libraries::{find_libraries, LibraryEnumerator, NativeEnumerator};
pub use crate::monitor::{fork_core, poll_child};
pub use crate::session::{collect_core, create_core, SessionConfig};
pub use crate::types::{ChildHandle, ChildStatus, DumpRequest, ExitInfo};
