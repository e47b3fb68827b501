use thiserror::Error;

/// Every condition that stops a benchmark run.
///
/// None of these are retried: a benchmark that papers over a failure is
/// measuring something other than the store.  The one exception is `Store`
/// from a single put or get, which is logged and skipped.
#[derive(Debug, Error)]
pub enum Error {
    /// An item was pushed after the queue was closed.
    #[error("work queue is closed")]
    QueueClosed,

    /// A queue was torn down while it still held items.
    #[error("work queue destroyed with {0} pending items")]
    QueueNotEmpty(usize),

    /// An item went through more stages than the pipeline has.
    #[error("work item {seed} already processed by {progress} stages")]
    StageOverflow { seed: u32, progress: usize },

    #[error("invalid command {0}")]
    UnknownOperation(String),

    #[error("invalid db {0}")]
    UnknownStore(String),

    #[error("open error: {0}")]
    Open(String),

    #[error("close error: {0}")]
    Close(String),

    /// An owned handle was still referenced when the pool tried to close it.
    #[error("handle {0} is still in use")]
    HandleInUse(usize),

    /// A store call failed.
    #[error("store error: {0}")]
    Store(String),

    /// Debug-mode verification saw something the key generator did not produce.
    #[error("verification failed: {0}")]
    Verification(String),

    /// The terminal queue held fewer items than were seeded.
    #[error("expected {expected} work items, found {found}")]
    LostWork { expected: usize, found: usize },

    #[error("thread create failed: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
