//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - LINE Login code exchange and profile retrieval
//! - Synthetic-email identity resolution
//! - Account provisioning against the hosted account store

pub mod handlers;
pub mod models;
pub mod provision;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::auth_routes;
