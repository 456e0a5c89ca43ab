//! WS-Policy support: model, document builder, reference resolution and
//! the per-endpoint policy engine.

pub mod builder;
pub mod engine;
pub mod model;
pub mod resolver;

pub use builder::PolicyBuilder;
pub use engine::{EndpointPolicy, PolicyEngine};
pub use model::{Alternative, Assertion, Policy, PolicyComponent, QName};
pub use resolver::{ReferenceResolver, RemoteReferenceResolver, CLASSPATH_PREFIX};
