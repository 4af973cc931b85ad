//! Fallback for targets without a supported dynamic loader interface.

use crate::libraries::{LibraryEnumerator, LibraryRecord};

/// Enumerator that reports no libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEnumerator;

impl LibraryEnumerator for NullEnumerator
{
    fn records(&self) -> Vec<LibraryRecord>
    {
        Vec::new()
    }
}
