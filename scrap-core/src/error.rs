//! Procedure errors and their wire projection.

use scrap_contracts::{ErrorCode, ProcedureKind, RpcError};

use crate::schema::ValidationErrors;
use crate::session::Role;

/// Failure of a single procedure invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcedureError {
    /// Input failed schema constraints.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// The procedure needs an identity and the context has none.
    #[error("authentication required")]
    Unauthenticated,

    /// The identity lacks the role the procedure needs.
    #[error("requires the {required} role")]
    Forbidden { required: Role },

    /// The referenced entity does not exist or is not visible to the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("procedure not found: {name}")]
    ProcedureNotFound { name: String },

    /// A query was invoked as a mutation or the other way round.
    #[error("'{procedure}' is a {actual}, not a {requested}")]
    KindMismatch {
        procedure: String,
        requested: ProcedureKind,
        actual: ProcedureKind,
    },

    #[error("storage error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProcedureError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::ProcedureNotFound { .. } => ErrorCode::ProcedureNotFound,
            Self::KindMismatch { .. } => ErrorCode::InvalidRequest,
            Self::Store(_) | Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Project onto the wire error carried in a batch response.
    ///
    /// Validation failures keep their per-field list under `data.fields`.
    pub fn to_rpc_error(&self) -> RpcError {
        let err = RpcError::new(self.code(), self.to_string());
        match self {
            Self::Validation(errors) => err.with_data(serde_json::json!({ "fields": errors })),
            Self::Forbidden { required } => {
                err.with_data(serde_json::json!({ "required_role": required }))
            }
            _ => err,
        }
    }
}

impl From<ProcedureError> for RpcError {
    fn from(err: ProcedureError) -> Self {
        err.to_rpc_error()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::{FieldError, Violation};

    #[test]
    fn test_validation_keeps_fields_on_the_wire() {
        let errors = ValidationErrors::single(FieldError::new(
            "color",
            Violation::InvalidFormat,
            "must be a hex color",
        ));
        let rpc = ProcedureError::from(errors).to_rpc_error();
        assert_eq!(rpc.code, ErrorCode::ValidationFailed);
        let data = rpc.data.unwrap();
        assert_eq!(data["fields"][0]["field"], "color");
        assert_eq!(data["fields"][0]["code"], "invalid_format");
    }

    #[test]
    fn test_authorization_failures_are_distinguishable() {
        assert_eq!(
            ProcedureError::Unauthenticated.code(),
            ErrorCode::Unauthenticated
        );
        let forbidden = ProcedureError::Forbidden {
            required: Role::Admin,
        };
        assert_eq!(forbidden.code(), ErrorCode::Forbidden);
        assert_eq!(forbidden.to_string(), "requires the admin role");
    }

    #[test]
    fn test_kind_mismatch_message() {
        let err = ProcedureError::KindMismatch {
            procedure: "feed.public".into(),
            requested: ProcedureKind::Mutation,
            actual: ProcedureKind::Query,
        };
        assert_eq!(err.to_string(), "'feed.public' is a query, not a mutation");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
