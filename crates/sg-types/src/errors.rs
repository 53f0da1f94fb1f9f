use thiserror::Error;

/// Main error type for sweepgen
#[derive(Error, Debug)]
pub enum SgError {
    #[error("Override error: {0}")]
    Override(#[from] OverrideError),

    #[error("Entrypoint error: {0}")]
    Entrypoint(#[from] EntrypointError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Override syntax errors, raised before any expansion happens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    #[error("Malformed override '{token}': {message}")]
    Malformed { token: String, message: String },

    #[error("Invalid override key '{key}': {message}")]
    InvalidKey { key: String, message: String },
}

/// Entrypoint resolution and invocation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntrypointError {
    #[error("Entrypoint not registered: {name}")]
    Unresolvable { name: String },

    #[error("Entrypoint {name} failed: {message}")]
    Generator { name: String, message: String },

    #[error("Entrypoints {first} and {second} both set key '{key}'")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },
}

/// Batch legality errors, raised once before chunking
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Illegal batch at job {job}: {message}")]
    LegalityViolation { job: usize, message: String },

    #[error("Sweep has {count} jobs, limit is {limit}")]
    TooManyJobs { count: usize, limit: usize },
}

/// Launcher errors, fatal for the remainder of the sweep
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Launch of chunk starting at job {initial_job_idx} failed: {message}")]
    ChunkFailed {
        initial_job_idx: usize,
        message: String,
    },

    #[error("Failed to spawn job {job_idx}: {source}")]
    Spawn {
        job_idx: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Job directory error for job {job_idx}: {message}")]
    JobDir { job_idx: usize, message: String },
}

/// Result type alias for sweepgen operations
pub type SgResult<T> = Result<T, SgError>;

/// Result alias for launcher operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SgError::Config(format!($($arg)*))
    };
}
