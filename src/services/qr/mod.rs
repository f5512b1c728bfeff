pub mod remote;

use async_trait::async_trait;

/// Opaque QR collaborator: payload in, displayable code reference out.
#[async_trait]
pub trait QrProvider: Send + Sync {
    async fn encode(&self, payload: &str) -> anyhow::Result<String>;
}
