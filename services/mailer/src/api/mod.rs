use std::sync::Arc;
use std::time::Duration;

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::*;
pub use router::create_router;
pub use types::*;

use crate::config::MailerConfig;
use crate::dispatch::Dispatcher;
use crate::mail::TransportFactory;
use crate::quota::QuotaTracker;
use crate::relay::RelayService;

pub struct ApiState {
    pub relay: Arc<RelayService>,
    pub config: Arc<MailerConfig>,
}

impl ApiState {
    pub fn new(relay: Arc<RelayService>, config: MailerConfig) -> Self {
        Self {
            relay,
            config: Arc::new(config),
        }
    }

    /// Wires a fresh quota table and dispatcher from `config` around the
    /// given transport factory.
    pub fn from_config(config: MailerConfig, transports: Arc<dyn TransportFactory>) -> Self {
        let relay = RelayService::new(
            QuotaTracker::new(config.quota_cap),
            Dispatcher::new(config.dispatch_policy()),
            transports,
            config.content_limits(),
        );
        Self::new(Arc::new(relay), config)
    }

    pub fn quota(&self) -> &QuotaTracker {
        self.relay.quota()
    }

    pub fn reset_interval(&self) -> Duration {
        Duration::from_secs(self.config.quota_reset_interval_secs)
    }
}
