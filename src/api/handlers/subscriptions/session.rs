//! Per-connection state machine for the `graphql-ws` sub-protocol.
//!
//! A connection must be initialized before it may start operations:
//!
//! - The first `connection_init` runs the registered initializer exactly once,
//!   then answers `connection_ack`.
//! - Any later `connection_init` is answered with `connection_error`; the
//!   initializer is not run again.
//! - `start` before initialization is answered with `connection_error` and the
//!   operation is dropped.
//! - `stop` forgets an operation and `connection_terminate` closes the session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use ulid::Ulid;

use super::initializer::{ConnectionInitRequest, ConnectionInitializer};

pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit {
        #[serde(default)]
        payload: Option<Value>,
    },
    Start {
        id: String,
        #[serde(default)]
        payload: Value,
    },
    Stop {
        id: String,
    },
    ConnectionTerminate,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck,
    ConnectionError { payload: ErrorPayload },
    Error { id: String, payload: ErrorPayload },
    Complete { id: String },
}

impl ServerMessage {
    #[must_use]
    pub fn connection_error(message: &str) -> Self {
        Self::ConnectionError {
            payload: ErrorPayload {
                message: message.to_string(),
            },
        }
    }
}

/// What the transport should do after a client message was handled.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionAction {
    Reply(ServerMessage),
    /// A started operation ready to be executed.
    Execute { id: String, payload: Value },
    Close,
    Ignore,
}

#[derive(Debug)]
pub struct ConnectionSession {
    id: String,
    initialized: bool,
    closed: bool,
    operations: BTreeSet<String>,
    attributes: HashMap<String, Value>,
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            initialized: false,
            closed: false,
            operations: BTreeSet::new(),
            attributes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    #[must_use]
    pub fn is_active(&self, operation_id: &str) -> bool {
        self.operations.contains(operation_id)
    }

    /// Forget an operation that finished on its own.
    pub fn complete(&mut self, operation_id: &str) {
        self.operations.remove(operation_id);
    }

    pub async fn handle(
        &mut self,
        message: ClientMessage,
        initializer: &dyn ConnectionInitializer,
    ) -> SessionAction {
        if self.closed {
            return SessionAction::Ignore;
        }

        match message {
            ClientMessage::ConnectionInit { payload } => {
                if self.initialized {
                    return SessionAction::Reply(ServerMessage::connection_error(
                        "Connection already initialized",
                    ));
                }
                initializer
                    .initialize(&ConnectionInitRequest { payload }, self)
                    .await;
                self.initialized = true;
                debug!(session = %self.id, "Subscription connection initialized");
                SessionAction::Reply(ServerMessage::ConnectionAck)
            }
            ClientMessage::Start { id, payload } => {
                if !self.initialized {
                    return SessionAction::Reply(ServerMessage::connection_error(
                        "Connection not initialized",
                    ));
                }
                if !self.operations.insert(id.clone()) {
                    return SessionAction::Reply(ServerMessage::Error {
                        id,
                        payload: ErrorPayload {
                            message: "Operation already started".to_string(),
                        },
                    });
                }
                SessionAction::Execute { id, payload }
            }
            ClientMessage::Stop { id } => {
                if self.operations.remove(&id) {
                    SessionAction::Reply(ServerMessage::Complete { id })
                } else {
                    SessionAction::Ignore
                }
            }
            ClientMessage::ConnectionTerminate => {
                self.closed = true;
                self.operations.clear();
                SessionAction::Close
            }
        }
    }
}
