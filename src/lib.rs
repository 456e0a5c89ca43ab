//! STS-backed SAML authentication for SOAP service clients
//!
//! Configures SOAP service proxies so that outgoing calls are authenticated
//! with a SAML token issued by a WS-Trust Security Token Service.
//!
//! # Features
//!
//! - STS client construction from endpoint URL and credentials
//! - Request context wiring of the STS client and token caching flag
//! - WS-Policy resolution (`classpath:`, `file:`, paths) and merging into the
//!   effective endpoint policy
//! - Service proxy factory with logging, metrics, WS-Addressing and callId headers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zentinel_soap_sts::{
//!     EndpointStsClientConfig, GenericPort, StsClientBuilder, StsProperties, WsClientBuilder,
//! };
//!
//! # fn main() -> Result<(), zentinel_soap_sts::SoapClientError> {
//! let properties = StsProperties::from_env()?;
//! let sts_client = Arc::new(StsClientBuilder::new().build(&properties));
//!
//! let port: GenericPort = WsClientBuilder::new().create_port("https://service.example.org/ws")?;
//! let port = EndpointStsClientConfig::new(sts_client).configure_request_saml_token(port)?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod feature;
pub mod interceptor;
pub mod metrics;
pub mod policy;
pub mod proxy;
pub mod security;
pub mod sts;
pub mod ws_client;
pub mod ws_clients;
pub mod xml;

pub use bus::Bus;
pub use client::{Client, ContextValue, EndpointInfo, RequestContext};
pub use config::{SoapVersion, StsProperties, WsClientConfig};
pub use endpoint::{EndpointStsClientConfig, STS_SAML_POLICY, STS_SAML_POLICY_NO_TRANSPORT_BINDING};
pub use error::SoapClientError;
pub use metrics::ClientMetrics;
pub use proxy::{ClientProxy, GenericPort, ProxyFactory, ServicePort};
pub use sts::{StsClient, StsClientBuilder, STS_CLIENT_AUTHENTICATION_POLICY};
pub use ws_client::WsClientBuilder;
pub use ws_clients::WsClients;
