//! Person envelope and wire codec
//!
//! The envelope is decoded from producer-controlled JSON, so the decoder is
//! deliberately tolerant: field lookup is ASCII-case-insensitive, unknown
//! fields are ignored, and missing provenance fields decode to `None`. Only
//! the `person` record itself is mandatory — its absence or malformation is
//! a [`DecodeError`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::ProcessInfo;

/// The domain record transported through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub email: String,
    pub address: String,
}

/// Wire-level wrapper carrying the person record plus producer/correlation
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonEnvelope {
    /// The domain payload (mandatory on the wire)
    pub person: Person,

    /// Producer-assigned identity linking producer- and consumer-side
    /// records of the same logical event; not unique across redeliveries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Name of the producing service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Producing host's kernel description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,

    /// Producing process's runtime description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

/// Typed failures of [`PersonEnvelope::from_bytes`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid message body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message body is not a JSON object")]
    NotAnObject,

    #[error("missing person record")]
    MissingPerson,

    #[error("malformed person record: {0}")]
    InvalidPerson(String),
}

impl PersonEnvelope {
    /// Create an envelope for publishing, with a fresh correlation id and
    /// the producer's process provenance.
    pub fn new(person: Person, process: &ProcessInfo) -> Self {
        Self {
            person,
            correlation_id: Some(Uuid::new_v4().to_string()),
            producer: Some(process.service.clone()),
            kernel: Some(process.kernel.clone()),
            framework: Some(process.framework.clone()),
        }
    }

    /// Encode to the canonical camelCase JSON wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from the wire form.
    ///
    /// Case-insensitive per field, unknown fields ignored, provenance
    /// fields optional. Round-trips with [`PersonEnvelope::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let root = value.as_object().ok_or(DecodeError::NotAnObject)?;

        let person = match get_ci(root, "person") {
            Some(v) => decode_person(v)?,
            None => return Err(DecodeError::MissingPerson),
        };

        Ok(Self {
            person,
            correlation_id: get_ci_string(root, "correlationId"),
            producer: get_ci_string(root, "producer"),
            kernel: get_ci_string(root, "kernel"),
            framework: get_ci_string(root, "framework"),
        })
    }
}

fn decode_person(value: &Value) -> Result<Person, DecodeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DecodeError::InvalidPerson("person is not a JSON object".to_string()))?;

    Ok(Person {
        name: person_string(obj, "name")?,
        age: person_age(obj)?,
        email: person_string(obj, "email")?,
        address: person_string(obj, "address")?,
    })
}

/// A string field of the person record: absent decodes to empty, but a
/// present value of the wrong type is a malformed record.
fn person_string(obj: &Map<String, Value>, field: &str) -> Result<String, DecodeError> {
    match get_ci(obj, field) {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(DecodeError::InvalidPerson(format!(
            "field '{}' is not a string: {}",
            field, other
        ))),
    }
}

fn person_age(obj: &Map<String, Value>) -> Result<i32, DecodeError> {
    match get_ci(obj, "age") {
        None => Ok(0),
        Some(v) => v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| DecodeError::InvalidPerson(format!("field 'age' is not an integer: {}", v))),
    }
}

/// Case-insensitive field lookup; first match wins.
fn get_ci<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Optional string field: absent or wrong-typed values decode to `None`
/// rather than failing — provenance must never break decoding.
fn get_ci_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    get_ci(obj, key).and_then(Value::as_str).map(str::to_string)
}
