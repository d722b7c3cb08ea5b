//! Base types and error handling.
//!
//! - [`ReqError`](error::ReqError) / [`ErrorKind`](error::ErrorKind): the
//!   tagged error taxonomy shared by every operation.
//! - [`ErrorHub`](events::ErrorHub): the per-client error notification
//!   channel.

pub mod error;
pub mod events;
