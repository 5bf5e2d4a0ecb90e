//! # PTRA Common Library
//!
//! Shared code for the Project Tracking and Reporting Application:
//! - Database schema, models and queries
//! - Weighted progress calculation
//! - Role hierarchy checks
//! - CSRF token lifecycle and password hashing
//! - Configuration loading
//! - Form validation

pub mod config;
pub mod csrf;
pub mod db;
pub mod error;
pub mod password;
pub mod progress;
pub mod roles;
pub mod validation;

pub use error::{Error, Result};
pub use progress::PhaseProgress;
pub use roles::Role;
