//! Request dispatch core for the Replicate proxy
//!
//! Pure decision logic, no I/O:
//! 1. `shape` classifies an inbound request into a `RequestShape`
//! 2. `invocation` resolves the shape into the single `UpstreamCall` to make
//! 3. `error` turns local rejections and upstream failures into the stable
//!    client envelope
//!
//! The two historical mounts of the proxy differ only in upscale constants,
//! captured by `EntryPoint`.

pub mod constants;
pub mod entry;
pub mod error;
pub mod invocation;
pub mod shape;

pub use entry::EntryPoint;
pub use error::{ClassifiedError, ErrorCode, ErrorKind, ValidationError};
pub use invocation::{Endpoint, ModelInvocation, Operation, Payload, UpstreamCall};
pub use shape::RequestShape;
