/// Errors from the live input feed.
///
/// The decision pipeline itself has no error paths: contention and timeouts
/// surface as ordinary decisions. Only the edge that reads native input can
/// fail.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The reader feeding the queue has stopped.
    #[error("input feed disconnected")]
    Disconnected,
    /// Reading from the terminal failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
