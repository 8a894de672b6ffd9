//! Configuration options for a burrow store.

/// Configuration options for opening a store.
#[derive(Debug, Clone)]
pub struct Options {
    /// Create the store directory if it doesn't exist.
    /// Default: true
    pub create_if_missing: bool,

    /// Fsync the log file after every append.
    /// Guards against data loss on power failure at the cost of write
    /// latency.
    /// Default: false
    pub sync_writes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_writes: false,
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store directory if it doesn't exist.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync the log after every append.
    pub fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }
}
