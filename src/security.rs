//! Well-known property keys and namespace URIs.
//!
//! Property keys mirror the names used in a client's request context so that
//! configuration written for other SOAP stacks reads the same here.

/// Username used by the STS client to authenticate itself.
pub const USERNAME: &str = "security.username";

/// Password used by the STS client to authenticate itself.
pub const PASSWORD: &str = "security.password";

/// Request context key holding the STS client for an endpoint.
pub const STS_CLIENT: &str = "security.sts.client";

/// Request context flag: cache the issued token on the endpoint rather than per request.
pub const CACHE_ISSUED_TOKEN_IN_ENDPOINT: &str = "security.cache.issued.token.in.endpoint";

/// WS-Policy 1.5 namespace.
pub const WSP_NS: &str = "http://www.w3.org/ns/ws-policy";
/// WS-Policy 1.2 (submission) namespace.
pub const WSP_12_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";
/// WS-SecurityPolicy 1.2 namespace.
pub const SP_NS: &str = "http://docs.oasis-open.org/ws-sx/ws-securitypolicy/200702";
/// WS-Trust 1.3 namespace.
pub const WST_NS: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
/// WS-Addressing 1.0 namespace.
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Returns true for either supported WS-Policy namespace.
pub fn is_policy_namespace(ns: &str) -> bool {
    ns == WSP_NS || ns == WSP_12_NS
}
