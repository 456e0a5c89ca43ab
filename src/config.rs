//! Configuration types: STS credentials and client settings.

use crate::error::{Result, SoapClientError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub const STS_URL_VAR: &str = "SECURITY_TOKEN_SERVICE_URL";
pub const STS_USERNAME_VAR: &str = "SECURITY_TOKEN_SERVICE_USERNAME";
pub const STS_PASSWORD_VAR: &str = "SECURITY_TOKEN_SERVICE_PASSWORD";

/// Endpoint and credentials of the Security Token Service.
#[derive(Clone, PartialEq, Eq)]
pub struct StsProperties {
    url: Url,
    username: String,
    password: String,
}

impl StsProperties {
    pub fn new(url: Url, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse `url` and build properties from it.
    pub fn parse(url: &str, username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| SoapClientError::invalid_url(url, e))?;
        Ok(Self::new(parsed, username, password))
    }

    /// Read the `SECURITY_TOKEN_SERVICE_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Read the `SECURITY_TOKEN_SERVICE_*` variables from `vars`.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let var = |key: &str| {
            vars.get(key)
                .cloned()
                .ok_or_else(|| SoapClientError::MissingVariable(key.to_string()))
        };
        Self::parse(&var(STS_URL_VAR)?, var(STS_USERNAME_VAR)?, var(STS_PASSWORD_VAR)?)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for StsProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsProperties")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    #[serde(rename = "1.1")]
    #[default]
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    #[serde(rename = "1.2")]
    Soap12,
}

/// Top-level configuration for the diagnostic binary and [`crate::WsClients`] users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WsClientConfig {
    /// Config version
    pub version: String,

    /// STS endpoint and credentials
    pub sts: Option<StsSettings>,

    /// Features attached to service ports
    pub features: FeatureSettings,

    /// Directories searched for `classpath:` policy documents
    pub resource_dirs: Vec<PathBuf>,

    /// Use the SAML policy without a transport binding (plain HTTP endpoints)
    pub allow_insecure_requests: bool,

    /// Named service endpoints
    pub endpoints: BTreeMap<String, EndpointSettings>,
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            sts: None,
            features: FeatureSettings::default(),
            resource_dirs: Vec::new(),
            allow_insecure_requests: false,
            endpoints: BTreeMap::new(),
        }
    }
}

/// STS settings as written in the config file.
#[derive(Clone, Serialize, Deserialize)]
pub struct StsSettings {
    /// STS endpoint URL
    pub url: String,

    /// Service user name
    pub username: String,

    /// Password; falls back to `SECURITY_TOKEN_SERVICE_PASSWORD` when absent
    #[serde(default)]
    pub password: Option<String>,
}

impl StsSettings {
    /// Resolve into [`StsProperties`], reading the password from the environment if needed.
    pub fn to_properties(&self) -> Result<StsProperties> {
        self.to_properties_with(|key| std::env::var(key).ok())
    }

    pub fn to_properties_with<F>(&self, lookup: F) -> Result<StsProperties>
    where
        F: Fn(&str) -> Option<String>,
    {
        let password = match &self.password {
            Some(password) => password.clone(),
            None => lookup(STS_PASSWORD_VAR)
                .ok_or_else(|| SoapClientError::MissingVariable(STS_PASSWORD_VAR.to_string()))?,
        };
        StsProperties::parse(&self.url, self.username.clone(), password)
    }
}

impl fmt::Debug for StsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Features attached to every service port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// Message logging
    pub logging: LoggingSettings,

    /// Add WS-Addressing headers
    pub addressing: bool,

    /// Add a callId header to outbound messages
    pub call_id: bool,

    /// Count outbound calls and failures per service
    pub metrics: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings::default(),
            addressing: true,
            call_id: true,
            metrics: true,
        }
    }
}

/// Message logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub enabled: bool,

    /// Maximum payload characters logged per message
    pub limit: usize,

    /// Log payloads across multiple lines
    pub pretty: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 48 * 1024,
            pretty: false,
        }
    }
}

/// A service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Service address
    pub url: String,

    /// Policy reference merged into the endpoint policy. When absent, the
    /// SAML policy chosen by `allow_insecure_requests` is used.
    #[serde(default)]
    pub policy: Option<String>,

    #[serde(default)]
    pub soap_version: SoapVersion,
}
