//! WS-Policy data model and normal-form computation.

use crate::xml::XmlElement;
use std::collections::BTreeSet;
use std::fmt;

/// Namespace-qualified XML name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName {
    /// Namespace URI (empty when unqualified)
    pub namespace: String,
    /// Local part
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// A single policy assertion, e.g. `sp:TransportBinding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub name: QName,
    /// Attributes other than `wsp:Optional` / `wsp:Ignorable`
    pub attributes: Vec<(QName, String)>,
    pub optional: bool,
    pub ignorable: bool,
    /// Nested `wsp:Policy`, if the assertion carries one
    pub nested: Option<Policy>,
    /// Non-policy child elements (e.g. `sp:RequestSecurityTokenTemplate`)
    pub content: Vec<XmlElement>,
    pub text: Option<String>,
}

impl Assertion {
    /// A bare assertion with no attributes or content.
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            optional: false,
            ignorable: false,
            nested: None,
            content: Vec::new(),
            text: None,
        }
    }

    pub fn with_nested(mut self, policy: Policy) -> Self {
        self.nested = Some(policy);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Attribute value by local name.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.local == local)
            .map(|(_, value)| value.as_str())
    }

    fn contains(&self, name: &QName) -> bool {
        &self.name == name
            || self
                .nested
                .as_ref()
                .is_some_and(|nested| nested.contains_assertion(name))
    }

    fn collect_names(&self, into: &mut BTreeSet<QName>) {
        into.insert(self.name.clone());
        if let Some(nested) = &self.nested {
            for component in &nested.components {
                component.collect_names(into);
            }
        }
    }
}

/// A policy expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyComponent {
    Assertion(Assertion),
    All(Vec<PolicyComponent>),
    ExactlyOne(Vec<PolicyComponent>),
}

/// One alternative of a normalised policy: assertions that must all hold.
pub type Alternative = Vec<Assertion>;

impl PolicyComponent {
    /// Alternatives of this component in normal form.
    pub fn alternatives(&self) -> Vec<Alternative> {
        match self {
            Self::Assertion(assertion) if assertion.optional => {
                let mut required = assertion.clone();
                required.optional = false;
                vec![vec![required], Vec::new()]
            }
            Self::Assertion(assertion) => vec![vec![assertion.clone()]],
            Self::All(components) => all_of(components),
            Self::ExactlyOne(components) => components
                .iter()
                .flat_map(|component| component.alternatives())
                .collect(),
        }
    }

    /// First alternative of [`PolicyComponent::alternatives`], found without
    /// enumerating the others.
    pub fn first_alternative(&self) -> Option<Alternative> {
        match self {
            Self::Assertion(assertion) => {
                let mut required = assertion.clone();
                required.optional = false;
                Some(vec![required])
            }
            Self::All(components) => first_of_all(components),
            Self::ExactlyOne(components) => components.iter().find_map(|c| c.first_alternative()),
        }
    }

    fn contains(&self, name: &QName) -> bool {
        match self {
            Self::Assertion(assertion) => assertion.contains(name),
            Self::All(components) | Self::ExactlyOne(components) => {
                components.iter().any(|c| c.contains(name))
            }
        }
    }

    fn collect_names(&self, into: &mut BTreeSet<QName>) {
        match self {
            Self::Assertion(assertion) => assertion.collect_names(into),
            Self::All(components) | Self::ExactlyOne(components) => {
                for component in components {
                    component.collect_names(into);
                }
            }
        }
    }
}

/// A WS-Policy expression. The top level behaves as `wsp:All`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// `wsu:Id` of the source element, if any
    pub id: Option<String>,
    pub components: Vec<PolicyComponent>,
}

impl Policy {
    /// The empty policy: one alternative with no requirements.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(components: Vec<PolicyComponent>) -> Self {
        Self {
            id: None,
            components,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Normal form: every way this policy can be satisfied.
    ///
    /// Grows exponentially with optional assertions and `ExactlyOne` choices;
    /// see [`Policy::first_alternative`] when one alternative is enough.
    pub fn alternatives(&self) -> Vec<Alternative> {
        all_of(&self.components)
    }

    /// The first alternative of the normal form; `None` if unsatisfiable.
    ///
    /// Linear in the size of the expression.
    pub fn first_alternative(&self) -> Option<Alternative> {
        first_of_all(&self.components)
    }

    /// Conjunction of `self` and `other`.
    pub fn merge(&self, other: &Policy) -> Policy {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Policy {
            id: None,
            components,
        }
    }

    /// True if any assertion in the expression, nested policies included, has `name`.
    pub fn contains_assertion(&self, name: &QName) -> bool {
        self.components.iter().any(|c| c.contains(name))
    }

    /// Names of every assertion in the expression, nested policies included.
    pub fn vocabulary(&self) -> BTreeSet<QName> {
        let mut names = BTreeSet::new();
        for component in &self.components {
            component.collect_names(&mut names);
        }
        names
    }
}

fn all_of(components: &[PolicyComponent]) -> Vec<Alternative> {
    components
        .iter()
        .fold(vec![Vec::new()], |acc, component| {
            cross(&acc, &component.alternatives())
        })
}

fn first_of_all(components: &[PolicyComponent]) -> Option<Alternative> {
    let mut alternative = Vec::new();
    for component in components {
        alternative.extend(component.first_alternative()?);
    }
    Some(alternative)
}

fn cross(left: &[Alternative], right: &[Alternative]) -> Vec<Alternative> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            let mut combined = l.clone();
            combined.extend(r.iter().cloned());
            out.push(combined);
        }
    }
    out
}
