//! Domain services for AuraClass.
//!
//! - [`token`]: bearer tokens that identify a user.
//! - [`workflow`]: the annual plan approval lifecycle.
//! - [`integration`]: outbound calls to the assistant and the workflow
//!   webhook, each recorded in the interaction log.

pub mod integration;
pub mod token;
pub mod workflow;
