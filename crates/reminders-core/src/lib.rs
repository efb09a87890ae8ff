pub mod caldav;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod eligibility;
pub mod error;
pub mod history;
pub mod io;
pub mod ntfy;
pub mod orchestrator;

pub use error::{ReminderError, Result};
