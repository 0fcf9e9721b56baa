//! Error taxonomy shared by every command handler.
//!
//! `Message` is the ordinary "command returned false" case: the text
//! goes to the message line and the interpreter treats the command as
//! failed (unless `!force` is in effect). `Abort` is the distinct
//! C-g path. I/O and pattern parse errors carry enough context for a
//! useful diagnostic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdError {
    /// Logical failure with a message-line diagnostic.
    #[error("{0}")]
    Message(String),

    /// User abort (C-g) propagated through prompts.
    #[error("Aborted")]
    Abort,

    /// Pattern / replacement / table parse error with the byte offset
    /// of the offending character (for the caret diagnostic).
    #[error("{msg} at byte {at}")]
    Parse { msg: String, at: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EdError {
    pub fn msg(text: impl Into<String>) -> EdError {
        EdError::Message(text.into())
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, EdError::Abort)
    }
}

/// Result type of command handlers and most editor services.
pub type CmdResult<T = ()> = Result<T, EdError>;

/// Shorthand used throughout command bodies.
pub fn failed<T>(text: impl Into<String>) -> CmdResult<T> {
    Err(EdError::msg(text))
}
