//! Features: reusable bundles of client configuration.

use crate::client::Client;
use crate::config::LoggingSettings;
use crate::interceptor::{AddressingInterceptor, LoggingInterceptor};
use crate::metrics::{ClientMetrics, MetricsInterceptor};
use std::sync::Arc;

/// Configures a client when it is created.
pub trait Feature: Send + Sync {
    fn name(&self) -> &'static str;

    fn initialize(&self, client: &mut Client);
}

/// Logs every outbound message through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingFeature {
    /// Maximum payload characters logged
    pub limit: usize,
    /// Keep payload line breaks
    pub pretty: bool,
}

impl LoggingFeature {
    pub const NAME: &'static str = "logging";

    pub fn new() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }

    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            limit: settings.limit,
            pretty: settings.pretty,
        }
    }
}

impl Default for LoggingFeature {
    fn default() -> Self {
        Self::new()
    }
}

impl Feature for LoggingFeature {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&self, client: &mut Client) {
        client.add_out_interceptor(Arc::new(LoggingInterceptor::new(self.limit, self.pretty)));
    }
}

/// Adds WS-Addressing headers to outbound messages.
#[derive(Debug, Clone, Default)]
pub struct AddressingFeature;

impl AddressingFeature {
    pub const NAME: &'static str = "addressing";
}

impl Feature for AddressingFeature {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&self, client: &mut Client) {
        client.add_out_interceptor(Arc::new(AddressingInterceptor));
    }
}

/// Counts outbound calls and failures per service.
#[derive(Debug, Clone, Default)]
pub struct MetricsFeature {
    metrics: Arc<ClientMetrics>,
}

impl MetricsFeature {
    pub const NAME: &'static str = "metrics";

    /// Record into `metrics`, which may be shared between clients.
    pub fn new(metrics: Arc<ClientMetrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }
}

impl Feature for MetricsFeature {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&self, client: &mut Client) {
        client.add_out_interceptor(Arc::new(MetricsInterceptor::new(Arc::clone(&self.metrics))));
    }
}
