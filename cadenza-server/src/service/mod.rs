//! Service Module
//!
//! Business logic layer for the server.
//! The controller orchestrates between the stores, the provider and the poller.

pub mod job;

// Re-export for convenience
pub use job as job_service;
pub use job::{JobController, JobError};
