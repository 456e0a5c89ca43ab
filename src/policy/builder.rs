//! Build [`Policy`] expressions from WS-Policy XML documents.

use super::model::{Assertion, Policy, PolicyComponent};
use crate::bus::ResourceManager;
use crate::error::{Result, SoapClientError};
use crate::security::{is_policy_namespace, WSU_NS};
use crate::xml::{parse_document, XmlElement};
use std::sync::Arc;

/// Maximum depth of same-document `wsp:PolicyReference` expansion.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Parses policy documents. Owns the resource manager used to locate them.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    resources: Arc<ResourceManager>,
}

impl PolicyBuilder {
    pub fn new(resources: Arc<ResourceManager>) -> Self {
        Self { resources }
    }

    /// Resource manager backing `classpath:` lookups.
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// Build the policy rooted at the document element.
    pub fn build_policy(&self, xml: &str) -> Result<Policy> {
        let root = parse_document(xml)?;
        if !is_policy_element(&root, "Policy") {
            return Err(SoapClientError::InvalidPolicy(format!(
                "Root element {} is not wsp:Policy",
                root.name
            )));
        }
        self.policy_from(&root, &root, 0)
    }

    /// Build the `wsp:Policy` element whose `wsu:Id` (or `Id`) equals `id`.
    pub fn build_policy_by_id(&self, xml: &str, id: &str) -> Result<Policy> {
        let root = parse_document(xml)?;
        let element = find_policy_by_id(&root, id)
            .ok_or_else(|| SoapClientError::PolicyNotFound(format!("#{}", id)))?;
        self.policy_from(element, &root, 0)
    }

    fn policy_from(&self, element: &XmlElement, document: &XmlElement, depth: usize) -> Result<Policy> {
        Ok(Policy {
            id: element_id(element).map(String::from),
            components: self.components_of(element, document, depth)?,
        })
    }

    fn components_of(
        &self,
        element: &XmlElement,
        document: &XmlElement,
        depth: usize,
    ) -> Result<Vec<PolicyComponent>> {
        element
            .children
            .iter()
            .map(|child| self.component_from(child, document, depth))
            .collect()
    }

    fn component_from(
        &self,
        element: &XmlElement,
        document: &XmlElement,
        depth: usize,
    ) -> Result<PolicyComponent> {
        if !is_policy_namespace(&element.name.namespace) {
            return self.assertion_from(element, document, depth);
        }

        match element.name.local.as_str() {
            "Policy" | "All" => Ok(PolicyComponent::All(
                self.components_of(element, document, depth)?,
            )),
            "ExactlyOne" => Ok(PolicyComponent::ExactlyOne(
                self.components_of(element, document, depth)?,
            )),
            "PolicyReference" => self.expand_reference(element, document, depth),
            other => Err(SoapClientError::InvalidPolicy(format!(
                "Unknown policy operator wsp:{}",
                other
            ))),
        }
    }

    fn expand_reference(
        &self,
        element: &XmlElement,
        document: &XmlElement,
        depth: usize,
    ) -> Result<PolicyComponent> {
        let uri = element.attribute("URI").ok_or_else(|| {
            SoapClientError::InvalidPolicy("wsp:PolicyReference without URI".to_string())
        })?;

        // Only references into the same document are expanded here.
        let id = uri
            .strip_prefix('#')
            .ok_or_else(|| SoapClientError::PolicyNotFound(uri.to_string()))?;

        if depth >= MAX_REFERENCE_DEPTH {
            return Err(SoapClientError::InvalidPolicy(format!(
                "Policy reference chain too deep at {}",
                uri
            )));
        }

        let target = find_policy_by_id(document, id)
            .ok_or_else(|| SoapClientError::PolicyNotFound(uri.to_string()))?;

        Ok(PolicyComponent::All(
            self.components_of(target, document, depth + 1)?,
        ))
    }

    fn assertion_from(
        &self,
        element: &XmlElement,
        document: &XmlElement,
        depth: usize,
    ) -> Result<PolicyComponent> {
        let mut assertion = Assertion::new(element.name.clone());
        assertion.text = element.text.clone();

        for attr in &element.attributes {
            if is_policy_namespace(&attr.name.namespace) {
                match attr.name.local.as_str() {
                    "Optional" => {
                        assertion.optional = is_true(&attr.value);
                        continue;
                    }
                    "Ignorable" => {
                        assertion.ignorable = is_true(&attr.value);
                        continue;
                    }
                    _ => {}
                }
            }
            assertion
                .attributes
                .push((attr.name.clone(), attr.value.clone()));
        }

        let mut nested: Option<Policy> = None;
        for child in &element.children {
            if is_policy_element(child, "Policy") {
                let policy = self.policy_from(child, document, depth)?;
                nested = Some(match nested {
                    Some(existing) => existing.merge(&policy),
                    None => policy,
                });
            } else {
                assertion.content.push(child.clone());
            }
        }
        assertion.nested = nested;

        Ok(PolicyComponent::Assertion(assertion))
    }
}

fn is_policy_element(element: &XmlElement, local: &str) -> bool {
    is_policy_namespace(&element.name.namespace) && element.name.local == local
}

fn element_id(element: &XmlElement) -> Option<&str> {
    element
        .attribute_ns(WSU_NS, "Id")
        .or_else(|| element.attribute("Id"))
}

fn find_policy_by_id<'a>(root: &'a XmlElement, id: &str) -> Option<&'a XmlElement> {
    root.find(&|e: &XmlElement| is_policy_element(e, "Policy") && element_id(e) == Some(id))
}

fn is_true(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::QName;
    use crate::security::SP_NS;

    fn builder() -> PolicyBuilder {
        PolicyBuilder::new(Arc::new(ResourceManager::new()))
    }

    const NESTED: &str = r#"<wsp:Policy wsu:Id="Outer"
    xmlns:wsp="http://www.w3.org/ns/ws-policy"
    xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd"
    xmlns:sp="http://docs.oasis-open.org/ws-sx/ws-securitypolicy/200702">
  <wsp:ExactlyOne>
    <wsp:All>
      <sp:TransportBinding>
        <wsp:Policy>
          <sp:IncludeTimestamp/>
        </wsp:Policy>
      </sp:TransportBinding>
      <sp:Wss11 wsp:Optional="true"/>
    </wsp:All>
  </wsp:ExactlyOne>
</wsp:Policy>"#;

    #[test]
    fn test_build_nested_policy() {
        let policy = builder().build_policy(NESTED).unwrap();
        assert_eq!(policy.id.as_deref(), Some("Outer"));
        assert!(policy.contains_assertion(&QName::new(SP_NS, "TransportBinding")));
        assert!(policy.contains_assertion(&QName::new(SP_NS, "IncludeTimestamp")));

        // Optional Wss11 yields a second alternative
        let alternatives = policy.alternatives();
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0].len(), 2);
        assert_eq!(alternatives[1].len(), 1);
    }

    #[test]
    fn test_optional_attribute_is_not_kept() {
        let policy = builder().build_policy(NESTED).unwrap();
        let alternatives = policy.alternatives();
        let wss11 = alternatives[0]
            .iter()
            .find(|a| a.name.local == "Wss11")
            .unwrap();
        assert!(wss11.attributes.is_empty());
    }

    #[test]
    fn test_ignorable_becomes_flag() {
        let xml = r#"<wsp:Policy xmlns:wsp="http://www.w3.org/ns/ws-policy"
            xmlns:sp="http://docs.oasis-open.org/ws-sx/ws-securitypolicy/200702">
          <sp:Wss11 wsp:Ignorable="true" sp:Mode="strict"/>
          <sp:SignedParts wsp:Ignorable="false"/>
        </wsp:Policy>"#;
        let policy = builder().build_policy(xml).unwrap();
        let alternative = policy.first_alternative().unwrap();

        let wss11 = alternative.iter().find(|a| a.name.local == "Wss11").unwrap();
        assert!(wss11.ignorable);
        assert!(!wss11.optional);
        assert_eq!(wss11.attributes, vec![(QName::new(SP_NS, "Mode"), "strict".to_string())]);

        let signed = alternative.iter().find(|a| a.name.local == "SignedParts").unwrap();
        assert!(!signed.ignorable);
        assert!(signed.attributes.is_empty());
    }

    #[test]
    fn test_rejects_non_policy_root() {
        let err = builder().build_policy("<Root/>").unwrap_err();
        assert!(matches!(err, SoapClientError::InvalidPolicy(_)));
    }

    #[test]
    fn test_accepts_submission_namespace() {
        let xml = r#"<wsp:Policy xmlns:wsp="http://schemas.xmlsoap.org/ws/2004/09/policy"
            xmlns:sp="http://docs.oasis-open.org/ws-sx/ws-securitypolicy/200702">
          <sp:SignedParts/>
        </wsp:Policy>"#;
        let policy = builder().build_policy(xml).unwrap();
        assert!(policy.contains_assertion(&QName::new(SP_NS, "SignedParts")));
    }

    #[test]
    fn test_build_by_id_and_local_reference() {
        let xml = r##"<Definitions xmlns:wsp="http://www.w3.org/ns/ws-policy"
            xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd"
            xmlns:sp="http://docs.oasis-open.org/ws-sx/ws-securitypolicy/200702">
          <wsp:Policy wsu:Id="Base">
            <sp:IncludeTimestamp/>
          </wsp:Policy>
          <wsp:Policy wsu:Id="Derived">
            <wsp:PolicyReference URI="#Base"/>
            <sp:SignedParts/>
          </wsp:Policy>
        </Definitions>"##;

        let derived = builder().build_policy_by_id(xml, "Derived").unwrap();
        assert!(derived.contains_assertion(&QName::new(SP_NS, "IncludeTimestamp")));
        assert!(derived.contains_assertion(&QName::new(SP_NS, "SignedParts")));

        let err = builder().build_policy_by_id(xml, "Missing").unwrap_err();
        assert!(matches!(err, SoapClientError::PolicyNotFound(_)));
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let xml = r##"<wsp:Policy wsu:Id="Loop"
            xmlns:wsp="http://www.w3.org/ns/ws-policy"
            xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
          <wsp:PolicyReference URI="#Loop"/>
        </wsp:Policy>"##;
        let err = builder().build_policy(xml).unwrap_err();
        assert!(matches!(err, SoapClientError::InvalidPolicy(_)));
    }

    #[test]
    fn test_external_reference_in_document_is_not_found() {
        let xml = r#"<wsp:Policy xmlns:wsp="http://www.w3.org/ns/ws-policy">
          <wsp:PolicyReference URI="http://example.org/policy.xml"/>
        </wsp:Policy>"#;
        let err = builder().build_policy(xml).unwrap_err();
        assert!(matches!(err, SoapClientError::PolicyNotFound(_)));
    }
}
