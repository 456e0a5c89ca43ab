//! Effective per-endpoint client policies.

use super::model::{Alternative, Policy, QName};
use crate::client::EndpointInfo;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use uuid::Uuid;

/// The effective policy of one client endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPolicy {
    policy: Policy,
    chosen_alternative: Option<Alternative>,
    vocabulary: BTreeSet<QName>,
}

impl EndpointPolicy {
    pub fn new(policy: Policy) -> Self {
        let chosen_alternative = policy.first_alternative();
        let vocabulary = policy.vocabulary();
        Self {
            policy,
            chosen_alternative,
            vocabulary,
        }
    }

    /// A new endpoint policy with `policy` merged into this one.
    pub fn update_policy(&self, policy: &Policy) -> EndpointPolicy {
        EndpointPolicy::new(self.policy.merge(policy))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// First alternative of the normalised policy; `None` if unsatisfiable.
    pub fn chosen_alternative(&self) -> Option<&Alternative> {
        self.chosen_alternative.as_ref()
    }

    /// Every assertion name the policy can require.
    pub fn vocabulary(&self) -> &BTreeSet<QName> {
        &self.vocabulary
    }

    pub fn contains_assertion(&self, name: &QName) -> bool {
        self.vocabulary.contains(name)
    }
}

/// Stores the client endpoint policies of every proxy created on a bus.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    client_policies: RwLock<HashMap<Uuid, EndpointPolicy>>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current policy for `endpoint`, or an empty one if none was set.
    pub fn get_client_endpoint_policy(&self, endpoint: &EndpointInfo) -> EndpointPolicy {
        self.client_policies
            .read()
            .get(&endpoint.id())
            .cloned()
            .unwrap_or_else(|| EndpointPolicy::new(Policy::empty()))
    }

    pub fn set_client_endpoint_policy(&self, endpoint: &EndpointInfo, policy: EndpointPolicy) {
        debug!(
            address = %endpoint.address(),
            assertions = policy.vocabulary().len(),
            "Setting client endpoint policy"
        );
        self.client_policies.write().insert(endpoint.id(), policy);
    }

    /// True if a policy was explicitly set for `endpoint`.
    pub fn has_client_endpoint_policy(&self, endpoint: &EndpointInfo) -> bool {
        self.client_policies.read().contains_key(&endpoint.id())
    }

    /// Forget the policy of `endpoint`. Called when its client is dropped.
    pub fn remove_client_endpoint_policy(&self, endpoint: &EndpointInfo) -> Option<EndpointPolicy> {
        self.client_policies.write().remove(&endpoint.id())
    }

    /// Number of endpoints with a stored policy.
    pub fn client_policy_count(&self) -> usize {
        self.client_policies.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SoapVersion;
    use crate::policy::{Assertion, PolicyComponent};

    fn endpoint(address: &str) -> EndpointInfo {
        EndpointInfo::new(
            address,
            QName::new("urn:test", "Svc"),
            QName::new("urn:test", "SvcPort"),
            SoapVersion::Soap11,
        )
    }

    fn single(local: &str) -> Policy {
        Policy::new(vec![PolicyComponent::Assertion(Assertion::new(QName::new(
            "urn:sp", local,
        )))])
    }

    #[test]
    fn test_default_policy_is_empty() {
        let engine = PolicyEngine::new();
        let ep = endpoint("http://localhost/a");
        let policy = engine.get_client_endpoint_policy(&ep);
        assert!(policy.policy().is_empty());
        assert_eq!(policy.chosen_alternative().map(|a| a.len()), Some(0));
        assert!(!engine.has_client_endpoint_policy(&ep));
    }

    #[test]
    fn test_update_and_set() {
        let engine = PolicyEngine::new();
        let ep = endpoint("http://localhost/a");

        let first = engine.get_client_endpoint_policy(&ep).update_policy(&single("A"));
        engine.set_client_endpoint_policy(&ep, first);
        let second = engine.get_client_endpoint_policy(&ep).update_policy(&single("B"));
        engine.set_client_endpoint_policy(&ep, second);

        let effective = engine.get_client_endpoint_policy(&ep);
        assert!(effective.contains_assertion(&QName::new("urn:sp", "A")));
        assert!(effective.contains_assertion(&QName::new("urn:sp", "B")));
        assert_eq!(effective.chosen_alternative().unwrap().len(), 2);
    }

    #[test]
    fn test_endpoints_are_independent() {
        let engine = PolicyEngine::new();
        let a = endpoint("http://localhost/same");
        let b = endpoint("http://localhost/same");

        let policy = engine.get_client_endpoint_policy(&a).update_policy(&single("A"));
        engine.set_client_endpoint_policy(&a, policy);

        assert!(engine.has_client_endpoint_policy(&a));
        assert!(!engine.has_client_endpoint_policy(&b));
    }

    #[test]
    fn test_remove_policy() {
        let engine = PolicyEngine::new();
        let ep = endpoint("http://localhost/a");
        let policy = engine.get_client_endpoint_policy(&ep).update_policy(&single("A"));
        engine.set_client_endpoint_policy(&ep, policy);
        assert_eq!(engine.client_policy_count(), 1);

        assert!(engine.remove_client_endpoint_policy(&ep).is_some());
        assert!(engine.remove_client_endpoint_policy(&ep).is_none());
        assert_eq!(engine.client_policy_count(), 0);
        assert!(engine.get_client_endpoint_policy(&ep).policy().is_empty());
    }

    #[test]
    fn test_update_with_many_optional_assertions() {
        let optionals = Policy::new(
            (0..40)
                .map(|i| {
                    PolicyComponent::Assertion(
                        Assertion::new(QName::new("urn:sp", format!("Opt{}", i))).optional(),
                    )
                })
                .collect(),
        );
        let updated = EndpointPolicy::new(Policy::empty()).update_policy(&optionals);
        assert_eq!(updated.chosen_alternative().map(|a| a.len()), Some(40));
        assert_eq!(updated.vocabulary().len(), 40);
    }
}
