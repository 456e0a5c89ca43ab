//! The bus: shared extensions used by every client created on it.

use crate::error::Result;
use crate::policy::{PolicyBuilder, PolicyEngine};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Policy documents compiled into the crate, addressed as `classpath:<name>`.
const BUNDLED_RESOURCES: &[(&str, &str)] = &[
    (
        "ws/untPolicy.xml",
        include_str!("../resources/ws/untPolicy.xml"),
    ),
    (
        "ws/requestSamlPolicy.xml",
        include_str!("../resources/ws/requestSamlPolicy.xml"),
    ),
    (
        "ws/requestSamlPolicyNoTransportBinding.xml",
        include_str!("../resources/ws/requestSamlPolicyNoTransportBinding.xml"),
    ),
];

/// Locates named resources.
///
/// Lookup order: runtime registrations, then search directories in the order
/// added, then bundled documents.
#[derive(Debug, Default)]
pub struct ResourceManager {
    registered: RwLock<HashMap<String, String>>,
    search_dirs: RwLock<Vec<PathBuf>>,
    bundled: bool,
}

impl ResourceManager {
    /// An empty manager without bundled documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager that also serves the bundled policy documents.
    pub fn with_bundled() -> Self {
        Self {
            bundled: true,
            ..Self::default()
        }
    }

    pub fn register(&self, name: impl Into<String>, content: impl Into<String>) {
        self.registered
            .write()
            .insert(normalize(&name.into()), content.into());
    }

    pub fn add_search_dir(&self, dir: impl Into<PathBuf>) {
        self.search_dirs.write().push(dir.into());
    }

    /// Content of `name`, or `None` if no source has it.
    ///
    /// Names must stay inside the search directories: `..`, `.` and root
    /// components are never resolved.
    pub fn resolve(&self, name: &str) -> Result<Option<String>> {
        let name = normalize(name);
        if !is_relative_name(&name) {
            warn!(resource = %name, "Refusing resource name outside search directories");
            return Ok(None);
        }

        if let Some(content) = self.registered.read().get(&name) {
            return Ok(Some(content.clone()));
        }

        for dir in self.search_dirs.read().iter() {
            let candidate = dir.join(Path::new(&name));
            if candidate.is_file() {
                debug!(resource = %name, path = %candidate.display(), "Resource found on disk");
                return Ok(Some(std::fs::read_to_string(candidate)?));
            }
        }

        if self.bundled {
            return Ok(BUNDLED_RESOURCES
                .iter()
                .find(|(bundled, _)| *bundled == name)
                .map(|(_, content)| content.to_string()));
        }

        Ok(None)
    }
}

fn normalize(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

fn is_relative_name(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

/// Holds the policy builder, policy engine and resource manager.
#[derive(Debug)]
pub struct Bus {
    id: Uuid,
    policy_builder: PolicyBuilder,
    policy_engine: PolicyEngine,
}

impl Bus {
    /// A bus serving the bundled policy documents.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> BusBuilder {
        BusBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn policy_builder(&self) -> &PolicyBuilder {
        &self.policy_builder
    }

    pub fn policy_engine(&self) -> &PolicyEngine {
        &self.policy_engine
    }

    pub fn resources(&self) -> &ResourceManager {
        self.policy_builder.resources()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Bus`].
#[derive(Debug, Default)]
pub struct BusBuilder {
    resource_dirs: Vec<PathBuf>,
    resources: Vec<(String, String)>,
    without_bundled: bool,
}

impl BusBuilder {
    /// Add a directory searched for `classpath:` resources.
    pub fn resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dirs.push(dir.into());
        self
    }

    /// Register an inline resource.
    pub fn resource(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.resources.push((name.into(), content.into()));
        self
    }

    /// Do not serve the bundled policy documents.
    pub fn without_bundled(mut self) -> Self {
        self.without_bundled = true;
        self
    }

    pub fn build(self) -> Bus {
        let resources = if self.without_bundled {
            ResourceManager::new()
        } else {
            ResourceManager::with_bundled()
        };
        for dir in self.resource_dirs {
            resources.add_search_dir(dir);
        }
        for (name, content) in self.resources {
            resources.register(name, content);
        }

        let bus = Bus {
            id: Uuid::new_v4(),
            policy_builder: PolicyBuilder::new(std::sync::Arc::new(resources)),
            policy_engine: PolicyEngine::new(),
        };
        debug!(bus_id = %bus.id, "Bus created");
        bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_resources() {
        let bus = Bus::new();
        for name in [
            "ws/untPolicy.xml",
            "ws/requestSamlPolicy.xml",
            "/ws/requestSamlPolicyNoTransportBinding.xml",
        ] {
            let content = bus.resources().resolve(name).unwrap();
            assert!(content.is_some(), "missing bundled resource {}", name);
        }
        assert!(bus.resources().resolve("ws/other.xml").unwrap().is_none());
    }

    #[test]
    fn test_without_bundled() {
        let bus = Bus::builder().without_bundled().build();
        assert!(bus.resources().resolve("ws/untPolicy.xml").unwrap().is_none());
    }

    #[test]
    fn test_registered_resource_overrides_bundled() {
        let bus = Bus::builder()
            .resource("ws/untPolicy.xml", "<custom/>")
            .build();
        assert_eq!(
            bus.resources().resolve("ws/untPolicy.xml").unwrap().as_deref(),
            Some("<custom/>")
        );
    }

    #[test]
    fn test_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("ws")).unwrap();
        std::fs::write(dir.path().join("ws/local.xml"), "<local/>").unwrap();

        let bus = Bus::builder().resource_dir(dir.path()).build();
        assert_eq!(
            bus.resources().resolve("ws/local.xml").unwrap().as_deref(),
            Some("<local/>")
        );
    }

    #[test]
    fn test_parent_components_are_not_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let resources = dir.path().join("res");
        std::fs::create_dir_all(resources.join("ws")).unwrap();
        std::fs::write(dir.path().join("outside.xml"), "<outside/>").unwrap();
        std::fs::write(resources.join("ws/inside.xml"), "<inside/>").unwrap();

        let bus = Bus::builder().resource_dir(&resources).build();
        for name in ["../outside.xml", "ws/../../outside.xml", "./ws/inside.xml"] {
            assert!(
                bus.resources().resolve(name).unwrap().is_none(),
                "resolved {}",
                name
            );
        }
        assert_eq!(
            bus.resources().resolve("ws/inside.xml").unwrap().as_deref(),
            Some("<inside/>")
        );
    }

    #[test]
    fn test_buses_have_distinct_ids() {
        assert_ne!(Bus::new().id(), Bus::new().id());
    }
}
