//! HTTP bodies, responses and the wire exchange.

pub mod body;
pub mod charset;
pub mod multipart;
pub mod response;
pub mod stream;

// Re-exports for convenience
pub use body::ResolvedBody;
pub use multipart::{Form, Part};
pub use response::ReqResponse;
pub use stream::HttpStream;
