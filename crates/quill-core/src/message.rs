//! The diagnostics sink.
//!
//! Append-only: the compiler reports problems here and keeps going, so one
//! run surfaces many independent errors. Warnings never affect validity.

use std::fmt;

use crate::error::{CError, CResult};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Warning,
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Warning => f.write_str("WARNING"),
            MessageType::Error => f.write_str("ERROR"),
        }
    }
}

/// One diagnostic: severity, position, stable machine code, human text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub ty: MessageType,
    pub span: Span,
    pub code: String,
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: [{}] {}", self.ty, self.span, self.code, self.text)
    }
}

/// The append-only diagnostics collector. Never fails, never throws.
#[derive(Debug, Default)]
pub struct Messages {
    messages: Vec<Message>,
    error_count: usize,
}

impl Messages {
    pub fn new() -> Messages {
        Messages::default()
    }

    pub fn message(
        &mut self,
        ty: MessageType,
        span: Span,
        code: impl Into<String>,
        text: impl Into<String>,
    ) {
        if ty == MessageType::Error {
            self.error_count += 1;
        }
        self.messages.push(Message {
            ty,
            span,
            code: code.into(),
            text: text.into(),
        });
    }

    pub fn warning(&mut self, span: Span, code: impl Into<String>, text: impl Into<String>) {
        self.message(MessageType::Warning, span, code, text);
    }

    pub fn error(&mut self, span: Span, code: impl Into<String>, text: impl Into<String>) {
        self.message(MessageType::Error, span, code, text);
    }

    pub fn report(&mut self, err: &CError) {
        self.error(err.span, err.code.clone(), err.message.clone());
    }

    /// Run `code`, converting a user error into a diagnostic. This is the
    /// definition-granularity recovery point: a failing definition reports
    /// and returns `None` while its siblings keep compiling.
    pub fn consume_error<T>(&mut self, code: impl FnOnce(&mut Messages) -> CResult<T>) -> Option<T> {
        match code(self) {
            Ok(v) => Some(v),
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.ty == MessageType::Error)
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn watcher(&self) -> ErrorWatcher {
        ErrorWatcher {
            last_count: self.error_count,
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Detects whether new errors were reported since the watcher was created or
/// last polled. Used to suppress follow-up diagnostics for code that already
/// failed.
#[derive(Debug)]
pub struct ErrorWatcher {
    last_count: usize,
}

impl ErrorWatcher {
    pub fn has_new_errors(&mut self, messages: &Messages) -> bool {
        let count = messages.error_count();
        let res = count > self.last_count;
        self.last_count = count;
        res
    }
}
