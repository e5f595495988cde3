//! Cadenza Core
//!
//! Core types and abstractions for the Cadenza music generation service.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, UserProfile, etc.)
//! - DTOs: Data transfer objects for the server API and the provider wire format
//! - Optimizer: The pre-submit rewrite applied to instrumental-only requests

pub mod domain;
pub mod dto;
pub mod optimizer;
