//! Concrete policies.
//!
//! Each policy is an independent implementation of [`Policy`](super::Policy);
//! [`PipelineBuilder`](super::PipelineBuilder) assembles them in the order
//! telemetry, request id, retry, logging, authentication, transport.

pub mod bearer;
pub mod logging;
pub mod request_id;
pub mod retry;
pub mod telemetry;
pub mod transport;

pub use bearer::{AccessToken, BearerTokenPolicy, TokenCredential};
pub use logging::LoggingPolicy;
pub use request_id::{RequestIdPolicy, CLIENT_REQUEST_ID};
pub use retry::{Host, RetryOptions, RetryPolicy};
pub use telemetry::TelemetryPolicy;
pub use transport::TransportPolicy;
