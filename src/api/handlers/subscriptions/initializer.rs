use async_trait::async_trait;
use serde_json::Value;

use super::session::ConnectionSession;

/// The `connection_init` message as received from the client.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionInitRequest {
    pub payload: Option<Value>,
}

/// Hook run once per connection, before any operation on it is processed.
///
/// Implementations typically read credentials from the init payload and stash
/// what they learn in the session attributes.
#[async_trait]
pub trait ConnectionInitializer: Send + Sync {
    async fn initialize(
        &self,
        _request: &ConnectionInitRequest,
        _session: &mut ConnectionSession,
    ) {
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopConnectionInitializer;

impl ConnectionInitializer for NoopConnectionInitializer {}
