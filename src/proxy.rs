//! Service proxies and the factory that creates them.

use crate::bus::Bus;
use crate::client::{Client, EndpointInfo};
use crate::config::SoapVersion;
use crate::error::{Result, SoapClientError};
use crate::feature::Feature;
use crate::interceptor::Interceptor;
use crate::policy::QName;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Access to the client behind a service proxy.
pub trait ClientProxy {
    fn client(&self) -> &Client;

    fn client_mut(&mut self) -> &mut Client;
}

/// A service contract that [`ProxyFactory`] can instantiate.
pub trait ServicePort: ClientProxy + Sized {
    fn service_name() -> QName;

    /// Port name; `<service>Port` in the service namespace unless overridden.
    fn endpoint_name() -> QName {
        let service = Self::service_name();
        QName::new(service.namespace, format!("{}Port", service.local))
    }

    fn from_client(client: Client) -> Self;
}

/// Declare a service port type.
///
/// ```
/// zentinel_soap_sts::service_port!(
///     /// Person lookups
///     pub PersonV3,
///     "http://nav.no/tjeneste/virksomhet/person/v3/Binding",
///     "Person_v3"
/// );
/// ```
#[macro_export]
macro_rules! service_port {
    (@define $(#[$meta:meta])* $vis:vis $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $name {
            client: $crate::client::Client,
        }

        impl $crate::proxy::ClientProxy for $name {
            fn client(&self) -> &$crate::client::Client {
                &self.client
            }

            fn client_mut(&mut self) -> &mut $crate::client::Client {
                &mut self.client
            }
        }
    };
    ($(#[$meta:meta])* $vis:vis $name:ident, $namespace:expr, $service:expr) => {
        $crate::service_port!(@define $(#[$meta])* $vis $name);

        impl $crate::proxy::ServicePort for $name {
            fn service_name() -> $crate::policy::QName {
                $crate::policy::QName::new($namespace, $service)
            }

            fn from_client(client: $crate::client::Client) -> Self {
                Self { client }
            }
        }
    };
    ($(#[$meta:meta])* $vis:vis $name:ident, $namespace:expr, $service:expr, $port:expr) => {
        $crate::service_port!(@define $(#[$meta])* $vis $name);

        impl $crate::proxy::ServicePort for $name {
            fn service_name() -> $crate::policy::QName {
                $crate::policy::QName::new($namespace, $service)
            }

            fn endpoint_name() -> $crate::policy::QName {
                $crate::policy::QName::new($namespace, $port)
            }

            fn from_client(client: $crate::client::Client) -> Self {
                Self { client }
            }
        }
    };
}

service_port!(
    /// Port without a typed contract.
    pub GenericPort,
    "urn:zentinel:soap:generic",
    "GenericService"
);

/// Creates service proxies.
pub struct ProxyFactory {
    bus: Arc<Bus>,
    address: Option<String>,
    service_name: Option<QName>,
    endpoint_name: Option<QName>,
    soap_version: SoapVersion,
    features: Vec<Arc<dyn Feature>>,
    out_interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ProxyFactory {
    /// Factory on a fresh bus.
    pub fn new() -> Self {
        Self::with_bus(Arc::new(Bus::new()))
    }

    /// Factory creating proxies on a shared `bus`.
    pub fn with_bus(bus: Arc<Bus>) -> Self {
        Self {
            bus,
            address: None,
            service_name: None,
            endpoint_name: None,
            soap_version: SoapVersion::default(),
            features: Vec::new(),
            out_interceptors: Vec::new(),
        }
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Service address; must parse as a URL when [`ProxyFactory::create`] runs.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Override the contract's service name.
    pub fn set_service_name(&mut self, name: QName) {
        self.service_name = Some(name);
    }

    /// Override the contract's port name.
    pub fn set_endpoint_name(&mut self, name: QName) {
        self.endpoint_name = Some(name);
    }

    pub fn set_soap_version(&mut self, version: SoapVersion) {
        self.soap_version = version;
    }

    pub fn features(&self) -> &[Arc<dyn Feature>] {
        &self.features
    }

    /// Features initialised on each created client, in order.
    pub fn features_mut(&mut self) -> &mut Vec<Arc<dyn Feature>> {
        &mut self.features
    }

    /// Interceptors added to each created client ahead of feature interceptors.
    pub fn out_interceptors_mut(&mut self) -> &mut Vec<Arc<dyn Interceptor>> {
        &mut self.out_interceptors
    }

    /// Create a proxy for `T`.
    ///
    /// Interceptors added directly run before those installed by features.
    pub fn create<T: ServicePort>(&self) -> Result<T> {
        let address = self
            .address
            .clone()
            .ok_or_else(|| SoapClientError::Config("No service address configured".to_string()))?;
        Url::parse(&address).map_err(|e| SoapClientError::invalid_url(address.as_str(), e))?;

        let endpoint = EndpointInfo::new(
            address,
            self.service_name.clone().unwrap_or_else(T::service_name),
            self.endpoint_name.clone().unwrap_or_else(T::endpoint_name),
            self.soap_version,
        );

        let mut client = Client::new(Arc::clone(&self.bus), endpoint);
        for interceptor in &self.out_interceptors {
            client.add_out_interceptor(Arc::clone(interceptor));
        }
        for feature in &self.features {
            client.add_feature(Arc::clone(feature));
        }

        debug!(
            address = %client.endpoint().address(),
            service = %client.endpoint().service_name(),
            features = client.features().len(),
            "Service proxy created"
        );

        Ok(T::from_client(client))
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("bus", &self.bus.id())
            .field("address", &self.address)
            .field("service_name", &self.service_name)
            .field("soap_version", &self.soap_version)
            .field(
                "features",
                &self.features.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("out_interceptors", &self.out_interceptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::LoggingFeature;
    use crate::interceptor::CallIdInterceptor;

    service_port!(TestPort, "urn:test", "Test_v1", "Test_v1Port");

    #[test]
    fn test_default_endpoint_name() {
        assert_eq!(
            GenericPort::endpoint_name(),
            QName::new("urn:zentinel:soap:generic", "GenericServicePort")
        );
        assert_eq!(TestPort::endpoint_name(), QName::new("urn:test", "Test_v1Port"));
    }

    #[test]
    fn test_create_requires_address() {
        let err = ProxyFactory::new().create::<GenericPort>().unwrap_err();
        assert!(matches!(err, SoapClientError::Config(_)));
    }

    #[test]
    fn test_create_rejects_invalid_address() {
        let mut factory = ProxyFactory::new();
        factory.set_address("not a url");
        let err = factory.create::<GenericPort>().unwrap_err();
        assert!(matches!(err, SoapClientError::InvalidUrl { .. }));
    }

    #[test]
    fn test_create_port() {
        let mut factory = ProxyFactory::new();
        factory.set_address("https://test.example.org/ws/Test/v1");
        factory.set_soap_version(SoapVersion::Soap12);
        factory.features_mut().push(Arc::new(LoggingFeature::new()));
        factory
            .out_interceptors_mut()
            .push(Arc::new(CallIdInterceptor::new(|| "id".to_string())));

        let port: TestPort = factory.create().unwrap();
        let endpoint = port.client().endpoint();
        assert_eq!(endpoint.address(), "https://test.example.org/ws/Test/v1");
        assert_eq!(endpoint.service_name(), &QName::new("urn:test", "Test_v1"));
        assert_eq!(endpoint.soap_version(), SoapVersion::Soap12);
        assert!(port.client().has_feature(LoggingFeature::NAME));

        let names: Vec<_> = port.client().out_interceptors().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["call-id", "logging"]);
        assert!(Arc::ptr_eq(port.client().bus(), factory.bus()));
    }

    #[test]
    fn test_name_overrides() {
        let mut factory = ProxyFactory::new();
        factory.set_address("http://localhost:8080/ws");
        factory.set_service_name(QName::new("urn:other", "Other"));
        factory.set_endpoint_name(QName::new("urn:other", "OtherPort"));
        let port: GenericPort = factory.create().unwrap();
        assert_eq!(port.client().endpoint().service_name().local, "Other");
        assert_eq!(port.client().endpoint().endpoint_name().local, "OtherPort");
    }

    #[test]
    fn test_each_proxy_has_its_own_endpoint() {
        let mut factory = ProxyFactory::new();
        factory.set_address("http://localhost:8080/ws");
        let a: GenericPort = factory.create().unwrap();
        let b: GenericPort = factory.create().unwrap();
        assert_ne!(a.client().endpoint().id(), b.client().endpoint().id());
    }
}
