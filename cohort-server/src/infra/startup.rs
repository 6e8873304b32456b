use std::sync::Arc;

use anyhow::{Context, Result};
use cohort_core::{
    application::unit_of_work::AppUnitOfWork,
    database::{InMemoryStore, PostgresDatabase},
    gateway::{
        HttpGatewayConfig, HttpPaymentGateway, OfflineGateway, PaymentGateway,
    },
};
use tracing::{info, warn};

use crate::infra::{app_state::AppState, config::Config};

/// Where repositories and the gateway live for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    /// In-memory store and offline gateway. Nothing survives a restart.
    InMemory,
}

pub async fn build_state(config: Config, backend: Backend) -> Result<AppState> {
    let config = Arc::new(config);

    match backend {
        Backend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set unless --in-memory is used")?;

            let db = PostgresDatabase::connect(url, config.db_max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            db.migrate().await.context("failed to run migrations")?;
            let stats = db.pool_stats();
            info!(
                size = stats.size,
                max_size = stats.max_size,
                "database ready"
            );

            let gateway = http_gateway(&config)?;
            let unit_of_work = Arc::new(AppUnitOfWork::from_postgres(&db));
            AppState::new(config, unit_of_work, gateway, Some(Arc::new(db)))
        }
        Backend::InMemory => {
            warn!("running with the in-memory store and offline gateway");
            let store = Arc::new(InMemoryStore::new());
            let gateway: Arc<dyn PaymentGateway> =
                Arc::new(OfflineGateway::new(config.gateway.key_id.clone()));
            let unit_of_work = Arc::new(AppUnitOfWork::from_memory(store));
            AppState::new(config, unit_of_work, gateway, None)
        }
    }
}

fn http_gateway(config: &Config) -> Result<Arc<dyn PaymentGateway>> {
    let base_url = config
        .gateway
        .base_url
        .clone()
        .context("GATEWAY_BASE_URL must be set unless --in-memory is used")?;

    let gateway = HttpPaymentGateway::new(HttpGatewayConfig {
        base_url,
        key_id: config.gateway.key_id.clone(),
        key_secret: config.gateway.key_secret.clone(),
        timeout: config.gateway.timeout,
    })
    .context("failed to build gateway client")?;

    Ok(Arc::new(gateway))
}
