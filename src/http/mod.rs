//! HTTP call plumbing.
//!
//! # Data Flow
//! ```text
//! CallDescriptor (request.rs)
//!     → cache key derived for cache + de-duplication
//!     → Transport::call (transport.rs)
//!     → ApiResponse (response.rs), or a classified ApiError
//! ```
//!
//! # Design Decisions
//! - Descriptors are plain data; the pipeline never mutates them
//! - The transport is a trait so the resilience pipeline can be driven by
//!   scripted transports in tests
//! - Error bodies are mined for a human-readable `detail`/`message`

pub mod request;
pub mod response;
pub mod transport;

pub use request::{CallDescriptor, Method, X_REQUEST_ID};
pub use response::ApiResponse;
pub use transport::{ReqwestTransport, Transport};
