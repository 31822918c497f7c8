//! User-visible notices.
//!
//! Non-fatal failures (order sync, wishlist rollback, per-file upload errors)
//! are reported through an injected [`Notifier`] rather than returned, since
//! nobody is awaiting them.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message meant for the user, not for the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Sink for user-visible notices. Must not block.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(notice = %notice.message, "Notice"),
            NoticeLevel::Warning => tracing::warn!(notice = %notice.message, "Notice"),
            NoticeLevel::Error => tracing::error!(notice = %notice.message, "Notice"),
        }
    }
}
