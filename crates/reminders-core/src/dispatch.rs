use crate::error::Result;

/// Delivers one notification. Delivery is best-effort and never retried here.
pub trait Dispatcher {
    /// `scheduled_at` asks the channel to hold the message until that epoch
    /// second instead of delivering immediately.
    fn send(&self, title: &str, body: &str, scheduled_at: Option<i64>) -> Result<()>;
}

impl<T: Dispatcher + ?Sized> Dispatcher for &T {
    fn send(&self, title: &str, body: &str, scheduled_at: Option<i64>) -> Result<()> {
        (**self).send(title, body, scheduled_at)
    }
}

// ---------------------------------------------------------------------------
// Notification titles
// ---------------------------------------------------------------------------

pub fn reminder_title(task: &str) -> String {
    format!("Reminder - {task}")
}

pub fn error_title(err: &impl std::fmt::Display) -> String {
    format!("Reminder - Error: '{err}'")
}

pub fn integration_error_title(err: &impl std::fmt::Display) -> String {
    format!("CalDAV Error: '{err}'")
}
