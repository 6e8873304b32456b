//! Client side of the external payment gateway. Only order creation is a
//! request/response call; settlement arrives later as a signed callback.

use async_trait::async_trait;
use thiserror::Error;

pub mod http;
pub mod offline;

pub use http::{HttpGatewayConfig, HttpPaymentGateway};
pub use offline::OfflineGateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    /// Merchant-side reference echoed back by the gateway.
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(String),
    #[error("gateway rejected the order with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("gateway returned a malformed order: {0}")]
    Malformed(String),
    #[error("gateway is unavailable")]
    Unavailable,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        request: &OrderRequest,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Public key identifier handed to clients for checkout.
    fn key_id(&self) -> &str;
}
