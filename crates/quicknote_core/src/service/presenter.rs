//! Presentation boundary used by the synchronizer.
//!
//! The core decides *what* to tell the user; implementations decide how
//! (dialog, toast, stderr line).

use std::fmt::{Display, Formatter};

/// Prompt shown before a note is deleted.
pub const DELETE_CONFIRM_PROMPT: &str = "Are you sure you want to delete this note?";

/// Human-readable failure message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// User interaction hooks.
pub trait Presenter {
    /// Asks the user to confirm a destructive action.
    fn confirm(&self, prompt: &str) -> bool;
    /// Shows a notification.
    fn notify(&self, notification: &Notification);
}

impl<P: Presenter + ?Sized> Presenter for &P {
    fn confirm(&self, prompt: &str) -> bool {
        (**self).confirm(prompt)
    }

    fn notify(&self, notification: &Notification) {
        (**self).notify(notification)
    }
}
