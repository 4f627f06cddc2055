//! Segment engine configuration.

/// Minimum size of a pooled buffer.
pub const DEFAULT_MIN_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for a [`crate::Filer`] and the writers and readers it creates.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Minimum capacity of each pooled buffer.
    pub min_buffer_size: usize,

    /// Maximum number of idle buffers kept by the pool.
    pub max_idle_buffers: usize,

    /// Whether to sync the file after every append (safer but slower).
    pub sync_on_append: bool,

    /// Whether readers verify every frame checksum when a segment is opened,
    /// rather than lazily on each `get`.
    pub verify_on_open: bool,

    /// Preallocation size used when a caller has no size limit of its own.
    pub default_size_limit: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_buffer_size: DEFAULT_MIN_BUFFER_SIZE,
            max_idle_buffers: 16,
            sync_on_append: false,
            verify_on_open: false,
            default_size_limit: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl SegmentConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum pooled buffer size.
    #[must_use]
    pub const fn min_buffer_size(mut self, size: usize) -> Self {
        self.min_buffer_size = size;
        self
    }

    /// Sets the maximum number of idle pooled buffers.
    #[must_use]
    pub const fn max_idle_buffers(mut self, count: usize) -> Self {
        self.max_idle_buffers = count;
        self
    }

    /// Sets whether to sync after every append.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Sets whether readers verify all checksums on open.
    #[must_use]
    pub const fn verify_on_open(mut self, value: bool) -> Self {
        self.verify_on_open = value;
        self
    }

    /// Sets the default segment size limit.
    #[must_use]
    pub const fn default_size_limit(mut self, size: u32) -> Self {
        self.default_size_limit = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SegmentConfig::default();
        assert_eq!(config.min_buffer_size, DEFAULT_MIN_BUFFER_SIZE);
        assert!(!config.sync_on_append);
        assert!(!config.verify_on_open);
    }

    #[test]
    fn builder_pattern() {
        let config = SegmentConfig::new()
            .sync_on_append(true)
            .verify_on_open(true)
            .min_buffer_size(512)
            .max_idle_buffers(2);

        assert!(config.sync_on_append);
        assert!(config.verify_on_open);
        assert_eq!(config.min_buffer_size, 512);
        assert_eq!(config.max_idle_buffers, 2);
    }
}
