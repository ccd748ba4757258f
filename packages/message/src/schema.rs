//! Strict parsing of upstream payloads.
//!
//! Payloads are decoded into the typed wire structs from
//! [`civic_feed_message_models`]. Any field that is present with the wrong
//! shape, or any required field that is missing, rejects the entire
//! payload. Extra fields are ignored.

use civic_feed_message_models::{
    Dialect, IncomingMessage, MessageEnvelope, MessagesEnvelope, Source, SourcesEnvelope,
};
use serde::de::DeserializeOwned;

/// A payload that does not match the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{context}: invalid response payload ({detail})")]
pub struct ValidationError {
    /// Which response was being parsed (e.g. `"Updates list"`).
    pub context: &'static str,
    /// Description of the first violation.
    pub detail: String,
}

impl ValidationError {
    /// Creates a validation error for the given context.
    #[must_use]
    pub fn new(context: &'static str, detail: impl Into<String>) -> Self {
        Self {
            context,
            detail: detail.into(),
        }
    }
}

/// Parses a `{messages: [...]}` payload.
///
/// # Errors
///
/// Returns [`ValidationError`] if the payload or any message in it does not
/// match the schema for `dialect`.
pub fn parse_messages(
    payload: serde_json::Value,
    dialect: Dialect,
) -> Result<Vec<IncomingMessage>, ValidationError> {
    let context = dialect.messages_context();
    let envelope: MessagesEnvelope = decode(payload, context)?;

    for (index, message) in envelope.messages.iter().enumerate() {
        check_dialect_rules(message, dialect, context, &format!("messages[{index}]"))?;
    }

    log::debug!(
        "{context}: accepted {} messages",
        envelope.messages.len()
    );

    Ok(envelope.messages)
}

/// Parses a `{message: {...}}` payload.
///
/// # Errors
///
/// Returns [`ValidationError`] if the payload does not match the schema for
/// `dialect`.
pub fn parse_message(
    payload: serde_json::Value,
    dialect: Dialect,
) -> Result<IncomingMessage, ValidationError> {
    let context = dialect.message_context();
    let envelope: MessageEnvelope = decode(payload, context)?;
    check_dialect_rules(&envelope.message, dialect, context, "message")?;
    Ok(envelope.message)
}

/// Parses a `{sources: [...]}` payload.
///
/// # Errors
///
/// Returns [`ValidationError`] if the payload does not match the schema.
pub fn parse_sources(
    payload: serde_json::Value,
    dialect: Dialect,
) -> Result<Vec<Source>, ValidationError> {
    let envelope: SourcesEnvelope = decode(payload, dialect.sources_context())?;
    Ok(envelope.sources)
}

fn decode<T: DeserializeOwned>(
    payload: serde_json::Value,
    context: &'static str,
) -> Result<T, ValidationError> {
    serde_json::from_value(payload).map_err(|e| {
        log::warn!("{context}: rejected payload: {e}");
        ValidationError::new(context, e.to_string())
    })
}

fn check_dialect_rules(
    message: &IncomingMessage,
    dialect: Dialect,
    context: &'static str,
    path: &str,
) -> Result<(), ValidationError> {
    if dialect.requires_locality() && message.locality.is_none() {
        log::warn!("{context}: {path} has no locality");
        return Err(ValidationError::new(
            context,
            format!("missing field `locality` at {path}"),
        ));
    }
    Ok(())
}
