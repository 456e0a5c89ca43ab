//! Outbound interceptors.

use crate::client::OutboundMessage;
use crate::error::{Result, SoapClientError};
use crate::policy::QName;
use crate::security::WSA_NS;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Namespace of the callId header expected by the receiving services.
pub const CALL_ID_NS: &str = "uri:no.nav.applikasjonsrammeverk";
pub const CALL_ID_LOCAL: &str = "callId";

/// A step in the outbound message chain.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle_message(&self, message: &mut OutboundMessage) -> Result<()>;

    /// Called in reverse order on every interceptor that already handled
    /// `message` when a later step fails, including the failing one.
    fn handle_fault(&self, _message: &OutboundMessage, _error: &SoapClientError) {}
}

type CallIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Adds a generated callId header to every outbound message.
#[derive(Clone)]
pub struct CallIdInterceptor {
    generator: CallIdGenerator,
    header: QName,
}

impl CallIdInterceptor {
    pub fn new<F>(generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            generator: Arc::new(generator),
            header: QName::new(CALL_ID_NS, CALL_ID_LOCAL),
        }
    }

    /// Random UUIDs as call ids.
    pub fn with_uuid() -> Self {
        Self::new(|| Uuid::new_v4().to_string())
    }

    /// Use a different header name.
    pub fn with_header(mut self, header: QName) -> Self {
        self.header = header;
        self
    }
}

impl fmt::Debug for CallIdInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallIdInterceptor")
            .field("header", &self.header)
            .finish()
    }
}

impl Interceptor for CallIdInterceptor {
    fn name(&self) -> &'static str {
        "call-id"
    }

    fn handle_message(&self, message: &mut OutboundMessage) -> Result<()> {
        let call_id = (self.generator)();
        info!(
            service = %message.service_name.local,
            operation = %message.operation,
            call_id = %call_id,
            "Outbound call"
        );
        message.add_header(self.header.clone(), call_id);
        Ok(())
    }
}

/// Logs outbound messages.
#[derive(Debug, Clone)]
pub struct LoggingInterceptor {
    limit: usize,
    pretty: bool,
}

impl LoggingInterceptor {
    pub fn new(limit: usize, pretty: bool) -> Self {
        Self { limit, pretty }
    }

    /// Payload as it will be logged: single-line unless pretty, cut at `limit` chars.
    pub fn format_payload(&self, payload: &str) -> String {
        let text = if self.pretty {
            payload.to_string()
        } else {
            payload
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("")
        };

        match text.char_indices().nth(self.limit) {
            Some((cut, _)) => format!("{}...(truncated)", &text[..cut]),
            None => text,
        }
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn handle_message(&self, message: &mut OutboundMessage) -> Result<()> {
        let headers: Vec<String> = message.headers.iter().map(|h| h.name.to_string()).collect();
        info!(
            address = %message.address,
            operation = %message.operation,
            headers = ?headers,
            payload = %self.format_payload(&message.payload),
            "Outbound message"
        );
        Ok(())
    }
}

/// Adds WS-Addressing `To`, `Action` and `MessageID` headers.
#[derive(Debug, Clone, Default)]
pub struct AddressingInterceptor;

impl AddressingInterceptor {
    /// Default action URI: `{namespace}/{service}/{operation}Request`.
    pub fn action_for(message: &OutboundMessage) -> String {
        format!(
            "{}/{}/{}Request",
            message.service_name.namespace.trim_end_matches('/'),
            message.service_name.local,
            message.operation
        )
    }
}

impl Interceptor for AddressingInterceptor {
    fn name(&self) -> &'static str {
        "addressing"
    }

    fn handle_message(&self, message: &mut OutboundMessage) -> Result<()> {
        let to = message.address.clone();
        let action = Self::action_for(message);
        message.add_header(QName::new(WSA_NS, "To"), to);
        message.add_header(QName::new(WSA_NS, "Action"), action);
        message.add_header(
            QName::new(WSA_NS, "MessageID"),
            format!("urn:uuid:{}", Uuid::new_v4()),
        );
        Ok(())
    }
}
