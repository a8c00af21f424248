//! Pro IRP: client relationship backend for insurance agents.
//!
//! This module exports the core components for the binary and for
//! integration tests.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod enrollment;
pub mod error;
pub mod logging;
pub mod store;
pub mod types;
