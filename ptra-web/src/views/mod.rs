//! Server-rendered HTML pages

pub mod activities;
pub mod dashboard;
pub mod format;
pub mod layout;
pub mod login;
pub mod progress;
pub mod projects;
pub mod reports;
pub mod users;

pub use layout::{error_page, Flash, FlashParams, Nav};
