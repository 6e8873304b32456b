use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use super::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};

#[derive(Clone)]
pub struct HttpGatewayConfig {
    pub base_url: Url,
    pub key_id: String,
    pub key_secret: Zeroizing<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGatewayConfig")
            .field("base_url", &self.base_url.as_str())
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Order client for a REST payment gateway: `POST {base}/v1/orders`
/// with HTTP basic auth (`key_id:key_secret`).
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    http_client: reqwest::Client,
    orders_url: Url,
    config: HttpGatewayConfig,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: String,
    amount: i64,
    currency: String,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        // `Url::join` replaces the last segment unless the base ends in '/'.
        let mut base = config.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let orders_url = base
            .join("v1/orders")
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;

        Ok(Self {
            http_client,
            orders_url,
            config,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        request: &OrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let response = self
            .http_client
            .post(self.orders_url.clone())
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.as_str()),
            )
            .json(&CreateOrderBody {
                amount: request.amount_minor,
                currency: &request.currency,
                receipt: &request.receipt,
            })
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gateway refused order creation");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: OrderBody = response
            .json()
            .await
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;

        if body.id.trim().is_empty() {
            return Err(GatewayError::Malformed("empty order id".into()));
        }
        if body.amount != request.amount_minor
            || !body.currency.eq_ignore_ascii_case(&request.currency)
        {
            return Err(GatewayError::Malformed(format!(
                "order {} echoed {} {} instead of {} {}",
                body.id,
                body.amount,
                body.currency,
                request.amount_minor,
                request.currency
            )));
        }

        debug!(order_id = %body.id, "gateway order created");
        Ok(GatewayOrder {
            order_id: body.id,
            amount_minor: body.amount,
            currency: body.currency.to_ascii_uppercase(),
        })
    }

    fn key_id(&self) -> &str {
        &self.config.key_id
    }
}
