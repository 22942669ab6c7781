//! Reader directory contract.
//!
//! The trace service asks the directory which readers are enabled when the
//! operator starts tracing on all readers at once. The directory is usually
//! backed by the configuration database, which may be unreachable.

#![allow(async_fn_in_trait)]

use osdpwatch_core::{ReaderId, Result};

/// Source of the currently enabled readers.
///
/// Uses native `async fn` in traits (Edition 2024), so it is used through
/// generics rather than as a trait object.
pub trait ReaderDirectory: Send + Sync {
    /// List the IDs of all enabled readers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable. Callers in this
    /// crate treat that as "no readers" rather than a failure.
    async fn list_enabled_readers(&self) -> Result<Vec<ReaderId>>;
}

/// Directory over a fixed list of readers.
///
/// Useful for hosts that configure readers statically.
#[derive(Debug, Clone, Default)]
pub struct StaticReaderDirectory {
    readers: Vec<ReaderId>,
}

impl StaticReaderDirectory {
    pub fn new(readers: Vec<ReaderId>) -> Self {
        Self { readers }
    }
}

impl ReaderDirectory for StaticReaderDirectory {
    async fn list_enabled_readers(&self) -> Result<Vec<ReaderId>> {
        Ok(self.readers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_lists_configured_readers() {
        let readers = vec![ReaderId::new(), ReaderId::new()];
        let directory = StaticReaderDirectory::new(readers.clone());

        assert_eq!(directory.list_enabled_readers().await.unwrap(), readers);
        assert!(
            StaticReaderDirectory::default()
                .list_enabled_readers()
                .await
                .unwrap()
                .is_empty()
        );
    }
}
