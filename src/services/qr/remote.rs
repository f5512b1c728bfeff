use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::QrProvider;

const MAX_ATTEMPTS: u32 = 3;

/// Renders the payload through an external QR image service and returns the
/// image URL as the displayable reference stored on the booking.
pub struct RemoteQrEncoder {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteQrEncoder {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl QrProvider for RemoteQrEncoder {
    async fn encode(&self, payload: &str) -> anyhow::Result<String> {
        let mut backoff = Duration::from_millis(200);
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self
                .client
                .get(&self.base_url)
                .query(&[("size", "256x256"), ("data", payload)])
                .send()
                .await;

            match result {
                Ok(response) => {
                    let response = response
                        .error_for_status()
                        .context("QR service returned error")?;
                    return Ok(response.url().to_string());
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "QR service unreachable");
                    last_err = Some(e);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }

        match last_err {
            Some(e) => Err(anyhow::Error::new(e).context("QR service unreachable after retries")),
            None => Err(anyhow::anyhow!("QR service retries exhausted")),
        }
    }
}
