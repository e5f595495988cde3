//! Core domain types
//!
//! This module contains the core domain structures used across Cadenza crates.
//! These types represent the fundamental business entities and are shared between
//! the server (for persistence and polling) and the CLI (for rendering).

pub mod job;
pub mod profile;
