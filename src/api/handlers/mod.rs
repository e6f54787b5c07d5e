//! API handlers for assetgate.
//!
//! This module organizes the service's route handlers: the auth core
//! (login, sessions, credentials, guards) plus health and self-service
//! endpoints.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;
