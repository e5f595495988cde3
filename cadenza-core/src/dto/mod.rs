//! Data Transfer Objects
//!
//! This module contains DTOs used for communication between Cadenza components
//! (CLI, server) and with the generation provider. DTOs are lightweight
//! representations optimized for network transfer.

pub mod job;
pub mod profile;
pub mod provider;
