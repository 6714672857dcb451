//! scrap-client - Batching client for the scrapbook procedure server
//!
//! [`BatchClient`] queues procedure calls and sends them together through a
//! [`BatchTransport`]. [`HttpTransport`] talks to the server's batch
//! endpoint; tests and embedders can supply their own transport.

pub mod batch;
pub mod error;
pub mod transport;

pub use batch::{BatchClient, BatchSettings, ResponseFuture};
pub use error::{ClientError, TransportError};
pub use transport::{BatchTransport, HttpTransport};
