//! Success and error messages for the user, and the collaborator that shows
//! them.
//!
//! The coordinator decides *that* something is worth telling the user and
//! *what* the message says. How it is rendered is up to the [Notifier].

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    Success,
    Error,
}

/// A message to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub alert_type: AlertType,
    pub message: String,
    pub details: String,
}

impl Alert {
    /// Create a new success alert
    pub fn success(message: &str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message: message.to_owned(),
            details: String::new(),
        }
    }

    /// Create a new error alert
    pub fn error(message: &str, details: &str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }
}

/// Shows alerts to the user and performs the redirect to the log in page.
pub trait Notifier: Send + Sync {
    /// Show `alert` to the user.
    fn notify(&self, alert: Alert);

    /// The session has ended, send the user to the log in page.
    fn redirect_to_login(&self);
}

/// A [Notifier] that writes alerts to the log, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: Alert) {
        match alert.alert_type {
            AlertType::Success => tracing::info!("{}", alert.message),
            AlertType::Error if alert.details.is_empty() => tracing::warn!("{}", alert.message),
            AlertType::Error => tracing::warn!("{}: {}", alert.message, alert.details),
        }
    }

    fn redirect_to_login(&self) {
        tracing::info!("Session ended, the user must log in again");
    }
}
