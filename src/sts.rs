//! STS (WS-Trust) client configuration.

use crate::bus::Bus;
use crate::config::StsProperties;
use crate::endpoint::EndpointStsClientConfig;
use crate::error::Result;
use crate::feature::{Feature, LoggingFeature};
use crate::policy::{Policy, ReferenceResolver, RemoteReferenceResolver};
use crate::proxy::ClientProxy;
use crate::security;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Policy the STS client uses to authenticate itself to the STS.
pub const STS_CLIENT_AUTHENTICATION_POLICY: &str = "classpath:ws/untPolicy.xml";

/// Client for a WS-Trust Security Token Service.
///
/// Holds only configuration; token requests are issued by the transport
/// that consumes the request context this client is stored in.
pub struct StsClient {
    bus: Arc<Bus>,
    location: Option<String>,
    enable_applies_to: bool,
    allow_renewing: bool,
    features: Vec<Arc<dyn Feature>>,
    properties: HashMap<String, String>,
    policy_reference: Option<String>,
}

impl StsClient {
    /// A client with WS-Trust defaults: appliesTo and renewal enabled.
    pub fn new(bus: Arc<Bus>) -> Self {
        Self {
            bus,
            location: None,
            enable_applies_to: true,
            allow_renewing: true,
            features: Vec::new(),
            properties: HashMap::new(),
            policy_reference: None,
        }
    }

    /// Bus used to resolve the client's own policy.
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// STS endpoint address.
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Send `wsp:AppliesTo` in token requests.
    pub fn set_enable_applies_to(&mut self, enable: bool) {
        self.enable_applies_to = enable;
    }

    pub fn is_enable_applies_to(&self) -> bool {
        self.enable_applies_to
    }

    /// Renew expired tokens instead of requesting new ones.
    pub fn set_allow_renewing(&mut self, allow: bool) {
        self.allow_renewing = allow;
    }

    pub fn is_allow_renewing(&self) -> bool {
        self.allow_renewing
    }

    /// Features applied to the client's own calls to the STS.
    pub fn set_features(&mut self, features: Vec<Arc<dyn Feature>>) {
        self.features = features;
    }

    pub fn features(&self) -> &[Arc<dyn Feature>] {
        &self.features
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.name() == name)
    }

    /// Replace all security properties, such as [`security::USERNAME`].
    pub fn set_properties(&mut self, properties: HashMap<String, String>) {
        self.properties = properties;
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Value of [`security::USERNAME`].
    pub fn username(&self) -> Option<&str> {
        self.property(security::USERNAME)
    }

    /// Value of [`security::PASSWORD`].
    pub fn password(&self) -> Option<&str> {
        self.property(security::PASSWORD)
    }

    /// Set the policy reference; it is resolved on demand by [`StsClient::resolve_policy`].
    pub fn set_policy(&mut self, policy_reference: impl Into<String>) {
        self.policy_reference = Some(policy_reference.into());
    }

    pub fn policy_reference(&self) -> Option<&str> {
        self.policy_reference.as_deref()
    }

    /// Resolve the configured policy reference through the bus.
    pub fn resolve_policy(&self) -> Result<Option<Policy>> {
        let Some(uri) = self.policy_reference.as_deref() else {
            return Ok(None);
        };
        let resolver = RemoteReferenceResolver::new("", self.bus.policy_builder());
        resolver.resolve_reference(uri).map(Some)
    }

    /// Configure `port` to obtain SAML tokens from this STS using the default policy.
    pub fn configure_for<T: ClientProxy>(self: &Arc<Self>, port: T) -> Result<T> {
        EndpointStsClientConfig::new(Arc::clone(self)).configure_request_saml_token(port)
    }
}

impl fmt::Debug for StsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let properties: HashMap<&str, &str> = self
            .properties
            .iter()
            .map(|(k, v)| {
                let value = if k == security::PASSWORD { "<redacted>" } else { v.as_str() };
                (k.as_str(), value)
            })
            .collect();

        f.debug_struct("StsClient")
            .field("location", &self.location)
            .field("enable_applies_to", &self.enable_applies_to)
            .field("allow_renewing", &self.allow_renewing)
            .field(
                "features",
                &self.features.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("properties", &properties)
            .field("policy_reference", &self.policy_reference)
            .finish()
    }
}

/// Builds [`StsClient`]s from [`StsProperties`].
#[derive(Debug, Clone)]
pub struct StsClientBuilder {
    bus: Arc<Bus>,
}

impl StsClientBuilder {
    /// Builder on a fresh bus.
    pub fn new() -> Self {
        Self::with_bus(Arc::new(Bus::new()))
    }

    /// Builder whose clients share `bus`.
    pub fn with_bus(bus: Arc<Bus>) -> Self {
        Self { bus }
    }

    /// Client authenticating with username and password, without appliesTo
    /// or renewal, and with message logging.
    pub fn build(&self, properties: &StsProperties) -> StsClient {
        let mut sts_client = StsClient::new(Arc::clone(&self.bus));

        sts_client.set_enable_applies_to(false);
        sts_client.set_allow_renewing(false);
        sts_client.set_location(properties.url().to_string());
        sts_client.set_features(vec![Arc::new(LoggingFeature::new())]);

        let mut props = HashMap::new();
        props.insert(security::USERNAME.to_string(), properties.username().to_string());
        props.insert(security::PASSWORD.to_string(), properties.password().to_string());
        sts_client.set_properties(props);

        sts_client.set_policy(STS_CLIENT_AUTHENTICATION_POLICY);

        debug!(
            location = %properties.url(),
            username = %properties.username(),
            "STS client built"
        );

        sts_client
    }
}

impl Default for StsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
