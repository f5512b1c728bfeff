use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{PaymentOutcome, PaymentProvider, PaymentRequest};

const MAX_ATTEMPTS: u32 = 3;

pub struct HttpPaymentGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct GatewayCharge<'a> {
    amount: i64,
    payer_id: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct GatewayResponse {
    status: String,
    transaction_ref: Option<String>,
    reason: Option<String>,
}

#[async_trait]
impl PaymentProvider for HttpPaymentGateway {
    async fn process(&self, request: &PaymentRequest) -> anyhow::Result<PaymentOutcome> {
        let url = format!("{}/charges", self.base_url);
        let charge = GatewayCharge {
            amount: request.amount,
            payer_id: &request.payer_id,
            description: &request.description,
        };

        let mut backoff = Duration::from_millis(200);
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self.client.post(&url).json(&charge).send().await;

            match result {
                Ok(response) => {
                    let body: GatewayResponse = response
                        .error_for_status()
                        .context("payment gateway returned error")?
                        .json()
                        .await
                        .context("bad payment gateway response")?;

                    return Ok(match body.status.as_str() {
                        "approved" => PaymentOutcome::Approved {
                            transaction_ref: body
                                .transaction_ref
                                .context("approved charge missing transaction ref")?,
                        },
                        _ => PaymentOutcome::Declined {
                            reason: body.reason.unwrap_or_else(|| body.status.clone()),
                        },
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "payment gateway unreachable");
                    last_err = Some(e);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }

        match last_err {
            Some(e) => Err(anyhow::Error::new(e).context("payment gateway unreachable after retries")),
            None => Err(anyhow::anyhow!("payment gateway retries exhausted")),
        }
    }
}
