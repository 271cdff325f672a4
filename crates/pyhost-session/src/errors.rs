use thiserror::Error;

/// Returned by raw interpreter capabilities when a call raised.
///
/// Carries no text: the interpreter keeps the rendered exception as its
/// pending error until the next `take_error` drains it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("interpreter call raised an exception")]
pub struct CallFailed;

/// Errors that can occur during session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Interpreter session is not running")]
    NotStarted,

    #[error("Failed to import module '{module}'")]
    Import { module: String },

    #[error("Failed to reload module")]
    Reload,

    #[error("Failed to execute source as module '{module}'")]
    Execute { module: String },

    #[error("No startup module is loaded")]
    NoStartupModule,
}
