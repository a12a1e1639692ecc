//! # Notifications
//!
//! One transient message at a time (the "toast"), replaced by the next and
//! dismissed automatically after a delay.
//!
//! ```text
//! notify("Checkout successful!") ──► current = Some(n1) ──┐
//!                                                         │ dismiss_after
//! notify("Payment initiated...") ──► current = Some(n2)   │ (n1 timer fires,
//!                                         │               │  sees n2, no-op)
//!                                         ▼               ▼
//!                                    dismiss_after ──► current = None
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
}

pub struct Notifier {
    current: Arc<watch::Sender<Option<Notification>>>,
    dismiss_after: Duration,
}

impl Notifier {
    pub fn new(dismiss_after: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Notifier {
            current: Arc::new(tx),
            dismiss_after,
        }
    }

    /// Shows `message`, replacing whatever is showing.
    ///
    /// The dismissal timer needs a tokio runtime; outside one the
    /// notification stays until replaced or dismissed.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
        };
        self.current.send_replace(Some(notification.clone()));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let current = Arc::clone(&self.current);
                let id = notification.id;
                let delay = self.dismiss_after;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    dismiss_if_current(&current, id);
                });
            }
            Err(_) => debug!("No runtime, notification will not auto-dismiss"),
        }

        notification
    }

    pub fn success(&self, message: impl Into<String>) -> Notification {
        self.notify(message, Severity::Success)
    }

    pub fn info(&self, message: impl Into<String>) -> Notification {
        self.notify(message, Severity::Info)
    }

    pub fn warning(&self, message: impl Into<String>) -> Notification {
        self.notify(message, Severity::Warning)
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        self.notify(message, Severity::Error)
    }

    /// Dismisses `id` if it is still showing. Returns whether it was.
    pub fn dismiss(&self, id: Uuid) -> bool {
        dismiss_if_current(&self.current, id)
    }

    pub fn current(&self) -> Option<Notification> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.current.subscribe()
    }
}

fn dismiss_if_current(current: &watch::Sender<Option<Notification>>, id: Uuid) -> bool {
    current.send_if_modified(|slot| {
        if slot.as_ref().is_some_and(|n| n.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    })
}
