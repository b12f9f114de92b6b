use crate::error::Result;
use crate::request::{Request, Response};

pub mod http;
pub mod mock;

pub use self::http::{HttpTransport, HttpTransportBuilder};
pub use self::mock::MockTransport;

/// Transport trait for sending one request and reading its raw response
///
/// A single instance is shared by every call of a
/// [`Dispatcher`](crate::Dispatcher), so implementations must be safe to use
/// concurrently. Non-success status codes are not errors at this level;
/// `Err` means the exchange itself failed.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the complete response
    async fn send(&self, request: Request) -> Result<Response>;
}
