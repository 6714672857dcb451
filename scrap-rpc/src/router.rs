//! Procedure registry.
//!
//! Procedures are registered in named groups and merged into a [`Router`].
//! Each registration erases the handler's input and output types: input is
//! parsed through [`Validate`] before the handler runs, output is serialized
//! to JSON after it returns.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use serde_json::Value;

use scrap_contracts::ProcedureKind;
use scrap_core::{ProcedureError, Validate};

use crate::context::Context;

/// Boxed future returned by an erased handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, ProcedureError>> + Send>>;

type ErasedHandler = Arc<dyn Fn(Context, Value) -> HandlerFuture + Send + Sync>;

/// A registered procedure: full name, kind and erased handler.
#[derive(Clone)]
pub struct Procedure {
    name: String,
    kind: ProcedureKind,
    handler: ErasedHandler,
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Procedure {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Validate `input` and run the handler.
    ///
    /// Validation failure short-circuits; the handler never sees bad input.
    pub fn call(&self, ctx: Context, input: Value) -> HandlerFuture {
        (self.handler)(ctx, input)
    }
}

fn erase<I, O, F, Fut>(handler: F) -> ErasedHandler
where
    I: Validate + Send + 'static,
    O: Serialize + 'static,
    F: Fn(Context, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ProcedureError>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |ctx: Context, raw: Value| -> HandlerFuture {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let input = I::parse(&raw)?;
            let output = (*handler)(ctx, input).await?;
            serde_json::to_value(output).map_err(|e| {
                ProcedureError::Internal(format!("failed to serialize procedure output: {e}"))
            })
        })
    })
}

/// Procedures sharing a name prefix, e.g. `todoCategory`.
#[derive(Debug, Clone)]
pub struct ProcedureGroup {
    prefix: String,
    procedures: Vec<Procedure>,
}

impl ProcedureGroup {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            procedures: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register a read-only procedure.
    pub fn query<I, O, F, Fut>(self, name: &str, handler: F) -> Self
    where
        I: Validate + Send + 'static,
        O: Serialize + 'static,
        F: Fn(Context, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ProcedureError>> + Send + 'static,
    {
        self.register(name, ProcedureKind::Query, erase(handler))
    }

    /// Register a state-changing procedure.
    pub fn mutation<I, O, F, Fut>(self, name: &str, handler: F) -> Self
    where
        I: Validate + Send + 'static,
        O: Serialize + 'static,
        F: Fn(Context, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ProcedureError>> + Send + 'static,
    {
        self.register(name, ProcedureKind::Mutation, erase(handler))
    }

    fn register(mut self, name: &str, kind: ProcedureKind, handler: ErasedHandler) -> Self {
        let name = if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        };
        self.procedures.push(Procedure {
            name,
            kind,
            handler,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterBuildError {
    #[error("procedure registered twice: {0}")]
    DuplicateProcedure(String),
    #[error("invalid procedure name: {0:?}")]
    InvalidName(String),
}

/// Collects groups and produces an immutable [`Router`].
#[derive(Debug, Default)]
pub struct RouterBuilder {
    groups: Vec<ProcedureGroup>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(mut self, group: ProcedureGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Fails on the first duplicate full name.
    pub fn build(self) -> Result<Router, RouterBuildError> {
        let mut procedures = IndexMap::new();
        for procedure in self.groups.into_iter().flat_map(|g| g.procedures) {
            if !is_valid_name(&procedure.name) {
                return Err(RouterBuildError::InvalidName(procedure.name));
            }
            match procedures.entry(procedure.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(RouterBuildError::DuplicateProcedure(procedure.name));
                }
                Entry::Vacant(slot) => {
                    slot.insert(procedure);
                }
            }
        }
        tracing::debug!(procedures = procedures.len(), "procedure router built");
        Ok(Router { procedures })
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|segment| !segment.is_empty() && !segment.contains(char::is_whitespace))
}

/// Name-addressed procedure table. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Router {
    procedures: IndexMap<String, Procedure>,
}

impl Router {
    pub fn get(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}
