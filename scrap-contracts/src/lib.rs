//! scrap-contracts - Wire types shared by the procedure server and the
//! batching client.
//!
//! Nothing here knows about handlers, sessions or storage; both transports
//! speak exactly these types.

pub mod error;
pub mod protocol;

pub use error::{ErrorCode, RpcError};
pub use protocol::{BatchRequest, BatchResponse, CallEnvelope, CallResult, ProcedureKind};
