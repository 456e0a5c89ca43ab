//! Outbound call counters per service.

use crate::client::OutboundMessage;
use crate::error::{Result, SoapClientError};
use crate::interceptor::Interceptor;
use crate::policy::QName;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    failures: AtomicU64,
}

/// Counts of one service at the time of a [`ClientMetrics::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCounts {
    pub service: QName,
    /// Outbound calls started
    pub calls: u64,
    /// Calls whose outbound chain failed
    pub failures: u64,
}

/// Shared call and failure counters, keyed by service name.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    services: RwLock<HashMap<QName, Arc<Counters>>>,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, service: &QName) -> Arc<Counters> {
        if let Some(counters) = self.services.read().get(service) {
            return Arc::clone(counters);
        }
        Arc::clone(self.services.write().entry(service.clone()).or_default())
    }

    pub fn record_call(&self, service: &QName) {
        self.counters(service).calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, service: &QName) {
        self.counters(service).failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn calls(&self, service: &QName) -> u64 {
        self.services
            .read()
            .get(service)
            .map_or(0, |c| c.calls.load(Ordering::Relaxed))
    }

    pub fn failures(&self, service: &QName) -> u64 {
        self.services
            .read()
            .get(service)
            .map_or(0, |c| c.failures.load(Ordering::Relaxed))
    }

    /// Current counts for every service seen, ordered by service name.
    pub fn snapshot(&self) -> Vec<ServiceCounts> {
        let mut counts: Vec<ServiceCounts> = self
            .services
            .read()
            .iter()
            .map(|(service, c)| ServiceCounts {
                service: service.clone(),
                calls: c.calls.load(Ordering::Relaxed),
                failures: c.failures.load(Ordering::Relaxed),
            })
            .collect();
        counts.sort_by(|a, b| a.service.cmp(&b.service));
        counts
    }
}

/// Records every outbound message, and every fault, in a [`ClientMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsInterceptor {
    metrics: Arc<ClientMetrics>,
}

impl MetricsInterceptor {
    pub fn new(metrics: Arc<ClientMetrics>) -> Self {
        Self { metrics }
    }
}

impl Interceptor for MetricsInterceptor {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn handle_message(&self, message: &mut OutboundMessage) -> Result<()> {
        self.metrics.record_call(&message.service_name);
        Ok(())
    }

    fn handle_fault(&self, message: &OutboundMessage, error: &SoapClientError) {
        debug!(
            service = %message.service_name,
            operation = %message.operation,
            error = %error,
            "Outbound call failed"
        );
        self.metrics.record_failure(&message.service_name);
    }
}
