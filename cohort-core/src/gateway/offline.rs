use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use super::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};

/// Gateway stand-in for in-memory runs and tests. Orders are minted locally;
/// availability can be toggled to exercise the failure path.
#[derive(Debug)]
pub struct OfflineGateway {
    key_id: String,
    available: AtomicBool,
    orders_created: AtomicUsize,
}

impl OfflineGateway {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            available: AtomicBool::new(true),
            orders_created: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn orders_created(&self) -> usize {
        self.orders_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for OfflineGateway {
    async fn create_order(
        &self,
        request: &OrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable);
        }

        self.orders_created.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            order_id: format!("order_{}", Uuid::new_v4().simple()),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
        })
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
