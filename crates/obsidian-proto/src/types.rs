//! Entity types exchanged with the monitoring backend.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProtoError;
use crate::validation;

/// Stable external key of a monitored service.
///
/// Chosen by the operator at registration time and immutable afterwards.
/// Every mutating REST call addresses a service by this key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Create a service key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ServiceId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl PartialEq<str> for ServiceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ServiceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Health classification of a service as reported by the snapshot surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceStatus {
    /// Service responds normally.
    Healthy,
    /// Service responds but with elevated errors or latency.
    Degraded,
    /// The gateway's breaker for this service is open.
    CircuitOpen,
    /// No classification yet, or a status this client does not know.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ServiceStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::CircuitOpen => "circuit-open",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker state carried by push events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are short-circuited.
    Open,
    /// A trial request is being allowed through.
    HalfOpen,
}

impl CircuitState {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered backend service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Storage-assigned identifier. Only used as a list key.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Natural key used by all mutating operations.
    pub service_id: ServiceId,
    /// Upstream URL the gateway proxies to.
    #[serde(default)]
    pub target_url: String,
    /// Last known health classification.
    #[serde(default)]
    pub status: ServiceStatus,
}

/// Body of a create or update request for a service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDraft {
    /// Human-readable name.
    pub name: String,
    /// Natural key. Must match the path key on update.
    pub service_id: ServiceId,
    /// Upstream URL.
    pub target_url: String,
}

impl ServiceDraft {
    /// Create a draft.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        service_id: impl Into<ServiceId>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_id: service_id.into(),
            target_url: target_url.into(),
        }
    }

    /// Check required fields and formats.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Validation`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), ProtoError> {
        validation::validate_name(&self.name)?;
        validation::validate_service_id(self.service_id.as_str())?;
        validation::validate_target_url(&self.target_url)?;
        Ok(())
    }
}

impl From<&Service> for ServiceDraft {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            service_id: service.service_id.clone(),
            target_url: service.target_url.clone(),
        }
    }
}

/// A circuit state transition pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitEvent {
    /// Backend-assigned event id, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Service whose breaker changed.
    pub service_id: ServiceId,
    /// Display name of that service.
    #[serde(default)]
    pub service_name: String,
    /// New breaker state.
    pub state: CircuitState,
    /// When the transition happened on the backend. `None` when absent or
    /// in a format this client cannot read.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CircuitEvent {
    /// Create an event without backend id or timestamp.
    #[must_use]
    pub fn new(
        service_id: impl Into<ServiceId>,
        service_name: impl Into<String>,
        state: CircuitState,
    ) -> Self {
        Self {
            id: None,
            service_id: service_id.into(),
            service_name: service_name.into(),
            state,
            timestamp: None,
        }
    }

    /// Set the backend id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the backend timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Severity of a log entry.
///
/// Parsing is case-insensitive; levels this client does not know are kept
/// verbatim in [`LogLevel::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    /// Debug output.
    Debug,
    /// Informational.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
    /// Any other level string.
    Other(String),
}

impl LogLevel {
    /// Canonical lowercase representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Other(level) => level,
        }
    }
}

impl From<String> for LogLevel {
    fn from(level: String) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Other(level),
        }
    }
}

impl From<&str> for LogLevel {
    fn from(level: &str) -> Self {
        Self::from(level.to_string())
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Other(level) => level,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A centralized log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Storage-assigned identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
    /// When the line was recorded. `None` when absent or unreadable.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    /// Emitting service.
    pub service_id: ServiceId,
    /// Display name of the emitting service, if the backend joined it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

impl LogEntry {
    /// Service label for display: the name when known, else the key.
    #[must_use]
    pub fn service_label(&self) -> &str {
        match self.service_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.service_id.as_str(),
        }
    }
}

/// Constraints for a log query.
///
/// An absent or empty field means "no constraint". It never means "match the
/// empty string".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Only lines of this level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Only lines from this service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Free-text search on the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl LogFilter {
    /// A filter with no constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain the level. An empty string clears the constraint.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = non_empty(level.into());
        self
    }

    /// Constrain the service. An empty string clears the constraint.
    #[must_use]
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = non_empty(service_id.into());
        self
    }

    /// Constrain the message text. An empty string clears the constraint.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = non_empty(search.into());
        self
    }

    /// Whether every field is unconstrained.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.query_pairs().is_empty()
    }

    /// Query parameters for `GET /logs`, omitting unconstrained fields.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("level", self.level.as_deref()),
            ("serviceId", self.service_id.as_deref()),
            ("search", self.search.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| match value {
            Some(value) if !value.is_empty() => Some((key, value)),
            _ => None,
        })
        .collect()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Accept identifiers encoded either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Epoch values at or above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Accept RFC 3339 strings, naive `YYYY-MM-DD HH:MM:SS` strings (as UTC) and
/// epoch seconds or milliseconds. Anything else decodes as `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f as i64))
            .and_then(from_epoch),
        Value::String(text) => parse_timestamp_str(text),
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(epoch) = text.parse::<i64>() {
        return from_epoch(epoch);
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}
