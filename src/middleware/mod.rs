//! Tower middleware layers applied around the proxy handler.
//!
//! [`correlation`] tags every request with a fresh [`CorrelationId`] and
//! logs its start and finish.

pub mod correlation;

pub use correlation::{correlate, CorrelationId};
