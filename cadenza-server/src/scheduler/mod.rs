//! Scheduler layer for the server
//!
//! This layer polls the provider for the status of accepted jobs and
//! reconciles each answer into the stored record. It owns the lifecycle of
//! every polling loop from start to cancellation.

pub mod poller;
pub mod reconcile;

pub use poller::{PollOutcome, PollSettings, StatusPoller};
