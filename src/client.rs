//! Client endpoint model: endpoint info, request context and the outbound
//! interceptor chain.

use crate::bus::Bus;
use crate::config::SoapVersion;
use crate::error::Result;
use crate::feature::Feature;
use crate::interceptor::Interceptor;
use crate::policy::{EndpointPolicy, QName};
use crate::security;
use crate::sts::StsClient;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Description of the remote endpoint a client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    id: Uuid,
    address: String,
    service_name: QName,
    endpoint_name: QName,
    soap_version: SoapVersion,
}

impl EndpointInfo {
    /// Each call yields a distinct endpoint, even for the same address.
    pub fn new(
        address: impl Into<String>,
        service_name: QName,
        endpoint_name: QName,
        soap_version: SoapVersion,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.into(),
            service_name,
            endpoint_name,
            soap_version,
        }
    }

    /// Identity of this endpoint; keys its policy in the [`crate::policy::PolicyEngine`].
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn service_name(&self) -> &QName {
        &self.service_name
    }

    pub fn endpoint_name(&self) -> &QName {
        &self.endpoint_name
    }

    pub fn soap_version(&self) -> SoapVersion {
        self.soap_version
    }
}

/// A value stored in the request context.
#[derive(Debug, Clone)]
pub enum ContextValue {
    Str(String),
    Bool(bool),
    StsClient(Arc<StsClient>),
}

/// Per-client properties consulted when messages are sent.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: HashMap<String, ContextValue>,
}

impl RequestContext {
    /// Store `value` under `key`, returning the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: ContextValue) -> Option<ContextValue> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// `key` as a boolean; `None` if absent or of another type.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ContextValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ContextValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// The STS client stored under [`security::STS_CLIENT`].
    pub fn sts_client(&self) -> Option<&Arc<StsClient>> {
        match self.values.get(security::STS_CLIENT) {
            Some(ContextValue::StsClient(client)) => Some(client),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A SOAP header added by an interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapHeader {
    pub name: QName,
    pub value: String,
}

/// An outbound message passing through the interceptor chain.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub address: String,
    pub service_name: QName,
    pub operation: String,
    pub soap_version: SoapVersion,
    pub headers: Vec<SoapHeader>,
    pub payload: String,
}

impl OutboundMessage {
    pub fn header(&self, name: &QName) -> Option<&SoapHeader> {
        self.headers.iter().find(|h| &h.name == name)
    }

    pub fn add_header(&mut self, name: QName, value: impl Into<String>) {
        self.headers.push(SoapHeader {
            name,
            value: value.into(),
        });
    }
}

/// A configured client for one endpoint.
pub struct Client {
    bus: Arc<Bus>,
    endpoint: EndpointInfo,
    request_context: RequestContext,
    features: Vec<Arc<dyn Feature>>,
    out_interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Client {
    /// A client with an empty request context and no interceptors.
    pub fn new(bus: Arc<Bus>, endpoint: EndpointInfo) -> Self {
        Self {
            bus,
            endpoint,
            request_context: RequestContext::default(),
            features: Vec::new(),
            out_interceptors: Vec::new(),
        }
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    pub fn endpoint(&self) -> &EndpointInfo {
        &self.endpoint
    }

    pub fn request_context(&self) -> &RequestContext {
        &self.request_context
    }

    /// Properties consulted when messages are sent, such as the STS client.
    pub fn request_context_mut(&mut self) -> &mut RequestContext {
        &mut self.request_context
    }

    /// Initialise `feature` against this client and remember it.
    pub fn add_feature(&mut self, feature: Arc<dyn Feature>) {
        feature.initialize(self);
        self.features.push(feature);
    }

    pub fn features(&self) -> &[Arc<dyn Feature>] {
        &self.features
    }

    /// True if a feature named `name` was added.
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.name() == name)
    }

    /// Append `interceptor` to the outbound chain.
    pub fn add_out_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.out_interceptors.push(interceptor);
    }

    pub fn out_interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.out_interceptors
    }

    /// The effective client policy held by the bus policy engine.
    pub fn effective_policy(&self) -> EndpointPolicy {
        self.bus.policy_engine().get_client_endpoint_policy(&self.endpoint)
    }

    /// Run the out-interceptor chain, in registration order, over a new message.
    ///
    /// On failure the interceptors that ran are given the fault, last first.
    pub fn prepare_outbound(
        &self,
        operation: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<OutboundMessage> {
        let mut message = OutboundMessage {
            address: self.endpoint.address.clone(),
            service_name: self.endpoint.service_name.clone(),
            operation: operation.into(),
            soap_version: self.endpoint.soap_version,
            headers: Vec::new(),
            payload: payload.into(),
        };

        for (index, interceptor) in self.out_interceptors.iter().enumerate() {
            if let Err(error) = interceptor.handle_message(&mut message) {
                for handled in self.out_interceptors[..=index].iter().rev() {
                    handled.handle_fault(&message, &error);
                }
                return Err(error);
            }
        }

        Ok(message)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.bus
            .policy_engine()
            .remove_client_endpoint_policy(&self.endpoint);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("bus", &self.bus.id())
            .field("endpoint", &self.endpoint)
            .field("request_context", &self.request_context)
            .field(
                "features",
                &self.features.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("out_interceptors", &self.out_interceptors.len())
            .finish()
    }
}
