//! Ready-to-use service ports secured with STS issued SAML tokens.

use crate::bus::Bus;
use crate::config::{FeatureSettings, SoapVersion};
use crate::endpoint::{
    EndpointStsClientConfig, STS_SAML_POLICY, STS_SAML_POLICY_NO_TRANSPORT_BINDING,
};
use crate::error::Result;
use crate::feature::{AddressingFeature, LoggingFeature, MetricsFeature};
use crate::interceptor::CallIdInterceptor;
use crate::metrics::ClientMetrics;
use crate::proxy::{ProxyFactory, ServicePort};
use crate::sts::StsClient;
use std::fmt;
use std::sync::Arc;

type CallIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Creates service ports with addressing, logging, metrics and callId
/// headers, then wires them to the STS.
pub struct WsClients {
    sts_config: EndpointStsClientConfig,
    bus: Arc<Bus>,
    call_id_generator: CallIdGenerator,
    features: FeatureSettings,
    metrics: Arc<ClientMetrics>,
    allow_insecure_requests: bool,
}

impl WsClients {
    /// Ports are created on the STS client's bus.
    pub fn new<F>(sts_client: Arc<StsClient>, call_id_generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        let bus = Arc::clone(sts_client.bus());
        Self {
            sts_config: EndpointStsClientConfig::new(sts_client),
            bus,
            call_id_generator: Arc::new(call_id_generator),
            features: FeatureSettings::default(),
            metrics: Arc::new(ClientMetrics::new()),
            allow_insecure_requests: false,
        }
    }

    pub fn with_features(mut self, features: FeatureSettings) -> Self {
        self.features = features;
        self
    }

    /// Let [`WsClients::port`] accept endpoints without a transport binding.
    pub fn with_allow_insecure_requests(mut self, allow: bool) -> Self {
        self.allow_insecure_requests = allow;
        self
    }

    /// Counters shared by every port created here.
    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    /// Policy used by [`WsClients::port`].
    pub fn default_policy(&self) -> &'static str {
        if self.allow_insecure_requests {
            STS_SAML_POLICY_NO_TRANSPORT_BINDING
        } else {
            STS_SAML_POLICY
        }
    }

    /// Port for `endpoint_url` using [`WsClients::default_policy`].
    pub fn port<T: ServicePort>(&self, endpoint_url: &str) -> Result<T> {
        self.port_with_policy(endpoint_url, self.default_policy())
    }

    pub fn port_with_policy<T: ServicePort>(&self, endpoint_url: &str, policy_uri: &str) -> Result<T> {
        self.build_port(endpoint_url, policy_uri, SoapVersion::default())
    }

    /// Port with every setting explicit.
    pub fn build_port<T: ServicePort>(
        &self,
        endpoint_url: &str,
        policy_uri: &str,
        soap_version: SoapVersion,
    ) -> Result<T> {
        let mut factory = ProxyFactory::with_bus(Arc::clone(&self.bus));
        factory.set_address(endpoint_url);
        factory.set_soap_version(soap_version);

        if self.features.call_id {
            let generator = Arc::clone(&self.call_id_generator);
            factory
                .out_interceptors_mut()
                .push(Arc::new(CallIdInterceptor::new(move || generator())));
        }
        if self.features.metrics {
            factory
                .features_mut()
                .push(Arc::new(MetricsFeature::new(Arc::clone(&self.metrics))));
        }
        if self.features.addressing {
            factory.features_mut().push(Arc::new(AddressingFeature));
        }
        if self.features.logging.enabled {
            factory
                .features_mut()
                .push(Arc::new(LoggingFeature::from_settings(&self.features.logging)));
        }

        let port = factory.create::<T>()?;
        self.sts_config
            .configure_request_saml_token_with_policy(port, policy_uri)
    }
}

impl fmt::Debug for WsClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsClients")
            .field("sts_config", &self.sts_config)
            .field("bus", &self.bus.id())
            .field("features", &self.features)
            .field("allow_insecure_requests", &self.allow_insecure_requests)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StsProperties;
    use crate::interceptor::{CALL_ID_LOCAL, CALL_ID_NS};
    use crate::policy::QName;
    use crate::proxy::{ClientProxy, GenericPort};
    use crate::security::{self, SP_NS, WSA_NS};
    use crate::sts::StsClientBuilder;

    fn clients() -> WsClients {
        let props = StsProperties::parse("https://sts.example.org/", "srvuser", "secret").unwrap();
        let sts = Arc::new(StsClientBuilder::new().build(&props));
        WsClients::new(sts, || "call-1".to_string())
    }

    #[test]
    fn test_port_is_fully_configured() {
        let port: GenericPort = clients().port("https://person.example.org/ws").unwrap();
        let client = port.client();

        assert!(client.request_context().sts_client().is_some());
        assert_eq!(
            client
                .request_context()
                .get_bool(security::CACHE_ISSUED_TOKEN_IN_ENDPOINT),
            Some(true)
        );
        assert!(client
            .effective_policy()
            .contains_assertion(&QName::new(SP_NS, "IssuedToken")));

        let names: Vec<_> = client.out_interceptors().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["call-id", "metrics", "addressing", "logging"]);

        let message = client.prepare_outbound("hentPerson", "<req/>").unwrap();
        let call_id = message
            .header(&QName::new(CALL_ID_NS, CALL_ID_LOCAL))
            .unwrap();
        assert_eq!(call_id.value, "call-1");
        assert!(message.header(&QName::new(WSA_NS, "Action")).is_some());
    }

    #[test]
    fn test_ports_share_the_sts_bus() {
        let clients = clients();
        let port: GenericPort = clients.port("https://person.example.org/ws").unwrap();
        let sts = port.client().request_context().sts_client().unwrap();
        assert!(Arc::ptr_eq(port.client().bus(), sts.bus()));
    }

    #[test]
    fn test_features_can_be_disabled() {
        let mut features = FeatureSettings::default();
        features.addressing = false;
        features.call_id = false;
        features.metrics = false;
        features.logging.enabled = false;

        let port: GenericPort = clients()
            .with_features(features)
            .port_with_policy("https://org.example.org/ws", STS_SAML_POLICY_NO_TRANSPORT_BINDING)
            .unwrap();
        assert!(port.client().out_interceptors().is_empty());
        assert!(!port
            .client()
            .effective_policy()
            .contains_assertion(&QName::new(SP_NS, "TransportBinding")));
    }

    #[test]
    fn test_insecure_requests_drop_transport_binding() {
        let transport_binding = QName::new(SP_NS, "TransportBinding");

        let secure: GenericPort = clients().port("https://org.example.org/ws").unwrap();
        assert!(secure.client().effective_policy().contains_assertion(&transport_binding));

        let clients = clients().with_allow_insecure_requests(true);
        assert_eq!(clients.default_policy(), STS_SAML_POLICY_NO_TRANSPORT_BINDING);
        let insecure: GenericPort = clients.port("http://org.example.org/ws").unwrap();
        let effective = insecure.client().effective_policy();
        assert!(!effective.contains_assertion(&transport_binding));
        assert!(effective.contains_assertion(&QName::new(SP_NS, "IssuedToken")));
    }

    #[test]
    fn test_metrics_are_shared_between_ports() {
        let clients = clients();
        let person: GenericPort = clients.port("https://person.example.org/ws").unwrap();
        let org: GenericPort = clients.port("https://org.example.org/ws").unwrap();
        person.client().prepare_outbound("hentPerson", "<req/>").unwrap();
        org.client().prepare_outbound("hentOrganisasjon", "<req/>").unwrap();

        let service = GenericPort::service_name();
        assert_eq!(clients.metrics().calls(&service), 2);
        assert_eq!(clients.metrics().failures(&service), 0);
    }

    #[test]
    fn test_dropped_ports_release_their_policy() {
        let clients = clients();
        for _ in 0..100 {
            let port: GenericPort = clients.port("https://person.example.org/ws").unwrap();
            drop(port);
        }
        let kept: GenericPort = clients.port("https://person.example.org/ws").unwrap();
        assert_eq!(kept.client().bus().policy_engine().client_policy_count(), 1);
    }

    #[test]
    fn test_build_port_soap_version() {
        let port: GenericPort = clients()
            .build_port("https://org.example.org/ws", STS_SAML_POLICY, SoapVersion::Soap12)
            .unwrap();
        assert_eq!(port.client().endpoint().soap_version(), SoapVersion::Soap12);
    }
}
