//! Wire an STS client and a SAML token policy into a service proxy.

use crate::bus::Bus;
use crate::client::{Client, ContextValue};
use crate::error::Result;
use crate::policy::{Policy, ReferenceResolver, RemoteReferenceResolver};
use crate::proxy::ClientProxy;
use crate::security;
use crate::sts::StsClient;
use std::sync::Arc;
use tracing::debug;

/// Transport binding plus an issued SAML 2.0 bearer token.
pub const STS_SAML_POLICY: &str = "classpath:ws/requestSamlPolicy.xml";

/// Issued SAML 2.0 bearer token without a transport binding.
pub const STS_SAML_POLICY_NO_TRANSPORT_BINDING: &str =
    "classpath:ws/requestSamlPolicyNoTransportBinding.xml";

/// Configures proxies to authenticate each call with a SAML token issued by an STS.
#[derive(Debug, Clone)]
pub struct EndpointStsClientConfig {
    sts_client: Arc<StsClient>,
}

impl EndpointStsClientConfig {
    pub fn new(sts_client: Arc<StsClient>) -> Self {
        Self { sts_client }
    }

    pub fn sts_client(&self) -> &Arc<StsClient> {
        &self.sts_client
    }

    /// Configure `port` with [`STS_SAML_POLICY`].
    pub fn configure_request_saml_token<T: ClientProxy>(&self, port: T) -> Result<T> {
        self.configure_request_saml_token_with_policy(port, STS_SAML_POLICY)
    }

    /// Configure `port` with the policy found at `policy_uri`.
    pub fn configure_request_saml_token_with_policy<T: ClientProxy>(
        &self,
        mut port: T,
        policy_uri: &str,
    ) -> Result<T> {
        let client = port.client_mut();

        self.configure_endpoint_with_policy_for_sts(client, policy_uri)?;

        Ok(port)
    }

    fn configure_endpoint_with_policy_for_sts(&self, client: &mut Client, policy_uri: &str) -> Result<()> {
        let ctx = client.request_context_mut();
        ctx.put(
            security::STS_CLIENT,
            ContextValue::StsClient(Arc::clone(&self.sts_client)),
        );
        ctx.put(security::CACHE_ISSUED_TOKEN_IN_ENDPOINT, ContextValue::Bool(true));

        self.configure_endpoint_policy_reference(client, policy_uri)
    }

    fn configure_endpoint_policy_reference(&self, client: &Client, policy_uri: &str) -> Result<()> {
        let policy = resolve_policy_reference(client.bus(), policy_uri)?;
        set_client_endpoint_policy(client, client.bus(), &policy);

        debug!(
            address = %client.endpoint().address(),
            policy_uri = %policy_uri,
            "Endpoint configured for STS issued SAML token"
        );
        Ok(())
    }
}

fn resolve_policy_reference(bus: &Bus, uri: &str) -> Result<Policy> {
    let resolver = RemoteReferenceResolver::new("", bus.policy_builder());
    resolver.resolve_reference(uri)
}

fn set_client_endpoint_policy(client: &Client, bus: &Bus, policy: &Policy) {
    let engine = bus.policy_engine();
    let endpoint = client.endpoint();
    let endpoint_policy = engine.get_client_endpoint_policy(endpoint);
    engine.set_client_endpoint_policy(endpoint, endpoint_policy.update_policy(policy));
}
