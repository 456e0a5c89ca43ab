//! Builder for logging-enabled service proxies.

use crate::error::Result;
use crate::feature::LoggingFeature;
use crate::proxy::{ProxyFactory, ServicePort};
use std::fmt;
use std::sync::Arc;

type FactorySupplier = Box<dyn Fn() -> ProxyFactory + Send + Sync>;

/// Creates service proxies with message logging attached.
pub struct WsClientBuilder {
    factory_supplier: FactorySupplier,
}

impl WsClientBuilder {
    pub fn new() -> Self {
        Self::with_factory_supplier(ProxyFactory::new)
    }

    /// Use `supplier` to obtain a fresh [`ProxyFactory`] for every port.
    pub fn with_factory_supplier<F>(supplier: F) -> Self
    where
        F: Fn() -> ProxyFactory + Send + Sync + 'static,
    {
        Self {
            factory_supplier: Box::new(supplier),
        }
    }

    pub fn create_port<T: ServicePort>(&self, service_url: &str) -> Result<T> {
        let mut factory = (self.factory_supplier)();

        factory.set_address(service_url);
        factory.features_mut().push(Arc::new(LoggingFeature::new()));

        factory.create::<T>()
    }
}

impl Default for WsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WsClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsClientBuilder").finish_non_exhaustive()
    }
}
