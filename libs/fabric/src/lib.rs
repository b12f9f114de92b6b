//! Courier Fabric - Request dispatch over a text transport
//!
//! Provides the transport abstraction (with a pooled HTTP implementation),
//! codec support (JSON), the result decoder that turns raw responses into
//! [`Outcome`](courier_core::Outcome)s, and the [`Dispatcher`] that ties them
//! together for `service/action` calls.
//!
//! # Example
//!
//! ```no_run
//! use courier_core::{Outcome, ServiceTarget};
//! use courier_fabric::{ClientConfig, Dispatcher};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct Login { user: String, pass: String }
//!
//! #[derive(Deserialize)]
//! struct Session { token: String }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::from_config(&ClientConfig::new("https://api.example.com"))?;
//! let target = ServiceTarget::parse("users", "login")?;
//! let login = Login { user: "a".into(), pass: "b".into() };
//!
//! match dispatcher.post::<_, Session>(&target, &login).await {
//!     Outcome::Success(session) => println!("token {}", session.token),
//!     Outcome::ValidationError(messages) => eprintln!("rejected: {messages:?}"),
//!     Outcome::AccessDenied(messages) => eprintln!("denied: {messages:?}"),
//!     Outcome::TransportError(messages) => eprintln!("failed: {messages:?}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod request;
pub mod transport;

// Re-exports for convenience
pub use config::ClientConfig;
pub use decoder::ResultDecoder;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
