//! Database schema, models and queries

pub mod activities;
pub mod images;
pub mod init;
pub mod models;
pub mod progress;
pub mod projects;
pub mod users;

pub use init::*;
pub use models::*;
