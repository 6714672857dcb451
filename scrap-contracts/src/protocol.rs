//! Call and batch envelopes.
//!
//! A batch request is a JSON array of [`CallEnvelope`]s; the batch response
//! is a JSON array of [`CallResult`]s aligned by position.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCode, RpcError};

/// Whether a procedure reads (`query`) or writes (`mutation`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcedureKind {
    Query,
    Mutation,
}

/// One procedure invocation on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub procedure: String,
    pub kind: ProcedureKind,
    #[serde(default)]
    pub input: Value,
}

impl CallEnvelope {
    pub fn new(procedure: impl Into<String>, kind: ProcedureKind, input: Value) -> Self {
        Self {
            procedure: procedure.into(),
            kind,
            input,
        }
    }
}

/// Outcome of one call inside a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl CallResult {
    /// Construct a success entry.
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    /// Construct a failure entry.
    pub fn failure(error: RpcError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error),
        }
    }

    /// Collapse the entry into a `Result`.
    ///
    /// A success without a `result` field is read as JSON `null`; a failure
    /// without an `error` object is reported as an internal error.
    pub fn into_result(self) -> Result<Value, RpcError> {
        if self.ok {
            return Ok(self.result.unwrap_or(Value::Null));
        }
        Err(self.error.unwrap_or_else(|| {
            RpcError::new(ErrorCode::InternalError, "failed call carried no error")
        }))
    }
}

impl From<Result<Value, RpcError>> for CallResult {
    fn from(value: Result<Value, RpcError>) -> Self {
        match value {
            Ok(v) => Self::success(v),
            Err(e) => Self::failure(e),
        }
    }
}

/// Ordered batch of calls sent as one request.
pub type BatchRequest = Vec<CallEnvelope>;

/// Ordered batch of results; entry `i` answers request entry `i`.
pub type BatchResponse = Vec<CallResult>;
