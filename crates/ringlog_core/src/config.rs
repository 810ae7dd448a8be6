//! Store configuration.

use crate::error::{CoreError, CoreResult};
use ringlog_storage::DEFAULT_DELIMITER;

/// Configuration for a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of resident records.
    pub capacity: usize,

    /// Record terminator byte.
    pub delimiter: u8,

    /// Largest chunk a front end reads from its transport at once, and the
    /// largest extent a single read returns.
    pub max_chunk: usize,

    /// Whether teardown removes the persisted image.
    pub destroy_backend_on_teardown: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            delimiter: DEFAULT_DELIMITER,
            max_chunk: 1024,
            destroy_backend_on_teardown: true,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of resident records.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the record terminator.
    #[must_use]
    pub const fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the maximum chunk size.
    #[must_use]
    pub const fn max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk;
        self
    }

    /// Sets whether teardown removes the persisted image.
    #[must_use]
    pub const fn destroy_backend_on_teardown(mut self, value: bool) -> Self {
        self.destroy_backend_on_teardown = value;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] for a zero capacity or a zero
    /// chunk size.
    pub fn validate(&self) -> CoreResult<()> {
        if self.capacity == 0 {
            return Err(CoreError::InvalidConfig("capacity must be at least 1".into()));
        }
        if self.max_chunk == 0 {
            return Err(CoreError::InvalidConfig("max_chunk must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.delimiter, b'\n');
        assert_eq!(config.max_chunk, 1024);
        assert!(config.destroy_backend_on_teardown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .capacity(2)
            .delimiter(b';')
            .max_chunk(16)
            .destroy_backend_on_teardown(false);

        assert_eq!(config.capacity, 2);
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.max_chunk, 16);
        assert!(!config.destroy_backend_on_teardown);
    }

    #[test]
    fn rejects_zero_sizes() {
        assert!(StoreConfig::new().capacity(0).validate().is_err());
        assert!(StoreConfig::new().max_chunk(0).validate().is_err());
    }
}
