//! HTTP handler modules for the stabilization API.
//!
//! Each sub-module implements thin handlers that decode parameters, acquire
//! the service lock, delegate to [`StabilizationService`], and answer with
//! the plain-text bodies workers expect. No business logic lives in
//! handlers.
//!
//! [`StabilizationService`]: crate::service::StabilizationService

pub mod graph;
pub mod results;
pub mod status;
pub mod votes;
pub mod work;

/// Body for any request whose atom or parameters fail to decode.
pub const DECODE_FAILURE: &str = "-1";

/// Body for a request that was applied.
pub const OK: &str = "1";
