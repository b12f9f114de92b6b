//! Courier Core - outcome model and fragment reconstruction
//!
//! Transport-free building blocks shared by the rest of the workspace:
//!
//! - [`Outcome`]: the closed, four-variant result of every service call
//! - [`ResponseEnvelope`] / [`EnvelopeHeader`]: the wire envelope and its
//!   mapping onto outcomes, plus [`TransportStatus`] classification
//! - [`ServiceTarget`]: validated `service/action` addressing
//! - [`BodyReconstructor`]: reassembly of one body from positioned fragments
//! - [`Reassembly`]: concurrent per-message registry of reconstructors
//!
//! # Example
//!
//! ```
//! use courier_core::{BodyReconstructor, Outcome};
//!
//! let mut body = BodyReconstructor::expecting(3);
//! body.append(1, "B".to_string()).unwrap();
//! body.append(0, "A".to_string()).unwrap();
//! body.append(2, "C".to_string()).unwrap();
//! assert_eq!(body.body().unwrap(), "ABC");
//!
//! let outcome: Outcome<u32> = Outcome::access_denied(["Access denied."]);
//! match outcome {
//!     Outcome::Success(value) => println!("got {value}"),
//!     Outcome::ValidationError(messages)
//!     | Outcome::AccessDenied(messages)
//!     | Outcome::TransportError(messages) => assert_eq!(messages.len(), 1),
//! }
//! ```

pub mod envelope;
pub mod error;
pub mod outcome;
pub mod reassembly;
pub mod reconstruct;
pub mod target;

// Re-exports for convenience
pub use envelope::{EnvelopeHeader, ResponseEnvelope, ResultTag, TransportStatus};
pub use error::{Error, Result};
pub use outcome::{Outcome, OutcomeKind};
pub use reassembly::{MessageId, Reassembly};
pub use reconstruct::{BodyReconstructor, Chunk, Termination};
pub use target::{ActionName, ServiceName, ServiceTarget};
