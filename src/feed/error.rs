//! Feed loading and resolution errors.

/// Error loading a GTFS feed from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A mandatory feed file is absent
    #[error("missing feed file: {file}")]
    MissingFile {
        /// File name relative to the feed directory
        file: &'static str,
    },

    /// A feed file has malformed content
    #[error("{file}:{line}: {message}")]
    BadFormat {
        /// File name relative to the feed directory
        file: &'static str,
        /// 1-based physical line number (the header is line 1)
        line: u64,
        /// What went wrong
        message: String,
    },

    /// An I/O failure other than a missing file
    #[error("failed to read {file}: {source}")]
    Io {
        /// File name relative to the feed directory
        file: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Error resolving a user-supplied station name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No stop name matches the query
    #[error("no station matches {0:?}")]
    NotFound(String),
}
