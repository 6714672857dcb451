//! In-process invocation.
//!
//! [`invoke`] is the single dispatch routine. The HTTP batch endpoint calls it
//! once per batch entry, and [`DirectCaller`] calls it for code running in the
//! same process (server-side rendering). Both paths therefore produce the
//! same result for the same procedure, input and session.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use scrap_contracts::ProcedureKind;
use scrap_core::ProcedureError;

use crate::context::Context;
use crate::router::Router;

/// Look up `name`, check its kind and run it with `ctx`.
pub async fn invoke(
    router: &Router,
    ctx: Context,
    kind: ProcedureKind,
    name: &str,
    input: Value,
) -> Result<Value, ProcedureError> {
    let Some(procedure) = router.get(name) else {
        return Err(ProcedureError::ProcedureNotFound {
            name: name.to_string(),
        });
    };
    if procedure.kind() != kind {
        return Err(ProcedureError::KindMismatch {
            procedure: name.to_string(),
            requested: kind,
            actual: procedure.kind(),
        });
    }

    let result = procedure.call(ctx, input).await;
    if let Err(err) = &result {
        tracing::debug!(procedure = name, %kind, code = %err.code(), "procedure failed");
    }
    result
}

/// Calls procedures without any serialization boundary in front of them.
#[derive(Debug, Clone)]
pub struct DirectCaller {
    router: Arc<Router>,
}

impl DirectCaller {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub async fn call(
        &self,
        ctx: Context,
        kind: ProcedureKind,
        name: &str,
        input: Value,
    ) -> Result<Value, ProcedureError> {
        invoke(&self.router, ctx, kind, name, input).await
    }

    pub async fn query(
        &self,
        ctx: Context,
        name: &str,
        input: Value,
    ) -> Result<Value, ProcedureError> {
        self.call(ctx, ProcedureKind::Query, name, input).await
    }

    pub async fn mutation(
        &self,
        ctx: Context,
        name: &str,
        input: Value,
    ) -> Result<Value, ProcedureError> {
        self.call(ctx, ProcedureKind::Mutation, name, input).await
    }

    /// [`query`](Self::query) decoded into `T`.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        ctx: Context,
        name: &str,
        input: Value,
    ) -> Result<T, ProcedureError> {
        let value = self.query(ctx, name, input).await?;
        serde_json::from_value(value)
            .map_err(|e| ProcedureError::Internal(format!("unexpected output of {name}: {e}")))
    }
}
