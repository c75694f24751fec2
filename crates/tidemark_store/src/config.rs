//! Store configuration.

/// Tuning knobs for a [`crate::DataStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether repeat fetches of the same query use delta-set fetching.
    pub delta_set_enabled: bool,
    /// Page size for paged pulls.
    pub page_size: u64,
    /// Capacity of the bounded channel between page producers and the
    /// single cache-applying consumer.
    pub pull_page_buffer: usize,
    /// Chunk size for fetching changed IDs during local-diff
    /// reconciliation.
    pub metadata_chunk_size: usize,
}

impl StoreConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self {
            delta_set_enabled: false,
            page_size: 10_000,
            pull_page_buffer: 10,
            metadata_chunk_size: 200,
        }
    }

    /// Enables or disables delta-set fetching.
    pub fn with_delta_set(mut self, enabled: bool) -> Self {
        self.delta_set_enabled = enabled;
        self
    }

    /// Sets the paged-pull page size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the pull channel capacity.
    pub fn with_pull_page_buffer(mut self, capacity: usize) -> Self {
        self.pull_page_buffer = capacity.max(1);
        self
    }

    /// Sets the local-diff ID chunk size.
    pub fn with_metadata_chunk_size(mut self, chunk_size: usize) -> Self {
        self.metadata_chunk_size = chunk_size.max(1);
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::new();
        assert!(!config.delta_set_enabled);
        assert_eq!(config.pull_page_buffer, 10);
        assert_eq!(config.metadata_chunk_size, 200);
    }

    #[test]
    fn builder_clamps_to_sane_minimums() {
        let config = StoreConfig::new()
            .with_page_size(0)
            .with_pull_page_buffer(0)
            .with_metadata_chunk_size(0);

        assert_eq!(config.page_size, 1);
        assert_eq!(config.pull_page_buffer, 1);
        assert_eq!(config.metadata_chunk_size, 1);
    }
}
