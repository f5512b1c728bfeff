pub mod gateway;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: i64,
    pub payer_id: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Approved { transaction_ref: String },
    Declined { reason: String },
}

/// Opaque payment collaborator: the core only acts on approved/declined.
/// Transport failures surface as errors after the provider's own bounded
/// retries.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn process(&self, request: &PaymentRequest) -> anyhow::Result<PaymentOutcome>;
}
