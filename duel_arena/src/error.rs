use thiserror::Error;

/// Failures acquiring the resources an arena runs on.  Nothing inside the
/// simulation loop is an error.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("pose source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("preview window: {0}")]
    Window(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
