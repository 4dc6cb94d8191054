//! HTTP service coordinating distributed package stabilization.
//!
//! Workers schedule dependencies, poll for packages whose dependencies are
//! all resolved, report verdicts, and upload build logs. This crate holds
//! the service coordinator, route definitions, configuration, and the
//! collaborators around them (correlation table, log archive, reporter).

pub mod config;
pub mod correlation;
pub mod error;
pub mod handlers;
pub mod logs;
pub mod reporter;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
