//! Login lifecycle events.
//!
//! Events are fire-and-forget: publishing never blocks the login and a
//! publisher without subscribers silently drops them.

use serde::Serialize;
use std::collections::BTreeSet;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{info, warn};

use super::credentials::FailureReason;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginEvent {
    LoginSucceeded {
        identity: String,
        roles: BTreeSet<String>,
    },
    LoginFailed {
        reason: FailureReason,
    },
}

#[derive(Clone, Debug)]
pub struct LoginEventPublisher {
    sender: broadcast::Sender<LoginEvent>,
}

impl Default for LoginEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: LoginEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LoginEvent> {
        self.sender.subscribe()
    }
}

/// Log every published event until the publisher is dropped.
pub fn spawn_audit_logger(publisher: &LoginEventPublisher) -> JoinHandle<()> {
    let mut receiver = publisher.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(LoginEvent::LoginSucceeded { identity, roles }) => {
                    info!(event = "login_succeeded", identity = %identity, ?roles, "Login succeeded");
                }
                Ok(LoginEvent::LoginFailed { reason }) => {
                    info!(event = "login_failed", reason = %reason, "Login failed");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Audit logger lagged, skipped {skipped} login events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
