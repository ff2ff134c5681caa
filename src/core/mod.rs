//! Core client logic: authentication, session, routing and job endpoints

pub mod auth;
pub mod config;
pub mod jobs;
pub mod notifications;

pub use notifications::{Notification, NotificationKind};
