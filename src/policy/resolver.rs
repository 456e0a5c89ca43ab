//! Resolve policy references (`classpath:`, `file:` and plain paths) to policies.

use super::builder::PolicyBuilder;
use super::model::Policy;
use crate::error::{Result, SoapClientError};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Scheme prefix for bus-managed resources.
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// Turns a policy reference URI into a [`Policy`].
pub trait ReferenceResolver {
    fn resolve_reference(&self, uri: &str) -> Result<Policy>;
}

/// Resolves references to documents outside the current one.
///
/// A fragment (`#id`) selects a `wsp:Policy` inside the loaded document;
/// without one the document root is the policy.
pub struct RemoteReferenceResolver<'a> {
    base_uri: String,
    builder: &'a PolicyBuilder,
}

impl<'a> RemoteReferenceResolver<'a> {
    /// `base_uri` is the directory against which relative paths resolve; empty means as-is.
    pub fn new(base_uri: impl Into<String>, builder: &'a PolicyBuilder) -> Self {
        Self {
            base_uri: base_uri.into(),
            builder,
        }
    }

    fn load(&self, uri: &str, location: &str) -> Result<String> {
        if let Some(name) = location.strip_prefix(CLASSPATH_PREFIX) {
            return self
                .builder
                .resources()
                .resolve(name)?
                .ok_or_else(|| SoapClientError::PolicyNotFound(uri.to_string()));
        }

        let path = match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| SoapClientError::PolicyNotFound(uri.to_string()))?,
            // Single-letter schemes are drive letters, not URLs
            Ok(url) if url.scheme().len() > 1 => {
                return Err(SoapClientError::UnsupportedScheme(url.scheme().to_string()));
            }
            _ => self.relative_path(location),
        };

        read_document(uri, &path)
    }

    fn relative_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if self.base_uri.is_empty() || path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.base_uri).join(path)
        }
    }
}

impl ReferenceResolver for RemoteReferenceResolver<'_> {
    fn resolve_reference(&self, uri: &str) -> Result<Policy> {
        let (location, fragment) = match uri.split_once('#') {
            Some((location, fragment)) => (location, Some(fragment)),
            None => (uri, None),
        };

        if location.is_empty() {
            // Same-document references are not remote
            return Err(SoapClientError::PolicyNotFound(uri.to_string()));
        }

        debug!(policy_uri = %uri, "Resolving policy reference");

        let document = self.load(uri, location)?;
        match fragment {
            Some(id) => self.builder.build_policy_by_id(&document, id),
            None => self.builder.build_policy(&document),
        }
    }
}

fn read_document(uri: &str, path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SoapClientError::PolicyNotFound(uri.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
