//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Health check handler.
pub mod health;
/// Orchestration handler.
pub mod orchestrate;
/// Provider catalog handler.
pub mod providers;
