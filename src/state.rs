use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    checkout::{
        CartStore, FanoutFailurePolicy, InMemoryCartStore, SubmissionGuard,
        payment::{ClientRedirect, HttpPaymentGateway},
    },
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub carts: Arc<dyn CartStore>,
    pub submissions: Arc<SubmissionGuard>,
    pub gateway: HttpPaymentGateway,
    pub redirect: ClientRedirect,
    /// Order ids whose header or item status just changed.
    pub order_events: broadcast::Sender<Uuid>,
    pub fanout_policy: FanoutFailurePolicy,
    pub poll_interval: Duration,
}

impl AppState {
    pub fn new(pool: DbPool, config: &AppConfig) -> anyhow::Result<Self> {
        let gateway = HttpPaymentGateway::new(
            config.payment_gateway_url.clone(),
            config.payment_gateway_timeout,
        )?;
        let (order_events, _) = broadcast::channel(256);
        Ok(Self {
            orm: orm_from_pool(&pool),
            pool,
            carts: Arc::new(InMemoryCartStore::new()),
            submissions: Arc::new(SubmissionGuard::new()),
            gateway,
            redirect: ClientRedirect,
            order_events,
            fanout_policy: config.fanout_failure_policy,
            poll_interval: config.order_poll_interval,
        })
    }

    pub fn publish_order_changed(&self, order_id: Uuid) {
        // No subscribers just means no open tracking views.
        let _ = self.order_events.send(order_id);
    }
}
