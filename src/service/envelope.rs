//! The uniform response shape returned for every request.

use crate::error::{ErrorKind, TabfitError};
use crate::evaluation::EvaluationResult;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Either `{"status": "success", "results": {...}}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Success(EvaluationResult),
    Failure { kind: ErrorKind, message: String },
}

impl ResponseEnvelope {
    pub fn from_error(err: &TabfitError) -> Self {
        ResponseEnvelope::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success(_))
    }

    pub fn results(&self) -> Option<&EvaluationResult> {
        match self {
            ResponseEnvelope::Success(results) => Some(results),
            ResponseEnvelope::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ResponseEnvelope::Success(_) => None,
            ResponseEnvelope::Failure { message, .. } => Some(message),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ResponseEnvelope::Success(_) => None,
            ResponseEnvelope::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl From<crate::error::Result<EvaluationResult>> for ResponseEnvelope {
    fn from(result: crate::error::Result<EvaluationResult>) -> Self {
        match result {
            Ok(results) => ResponseEnvelope::Success(results),
            Err(err) => ResponseEnvelope::from_error(&err),
        }
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResponseEnvelope::Success(results) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", "success")?;
                map.serialize_entry("results", results)?;
                map.end()
            }
            ResponseEnvelope::Failure { message, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}
