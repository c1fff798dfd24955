//! Error types for scripthook.

use thiserror::Error;

/// Common error type for scripthook.
#[derive(Error, Debug)]
pub enum HookError {
    /// Error raised inside a Lua VM (load, execution, value conversion).
    #[error("script error: {0}")]
    Script(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Lua errors are absorbed at the dispatch boundary; this conversion is for
// the VM construction and chunk execution paths.
impl From<mlua::Error> for HookError {
    fn from(e: mlua::Error) -> Self {
        HookError::Script(e.to_string())
    }
}

/// Result type alias for scripthook operations.
pub type Result<T> = std::result::Result<T, HookError>;
