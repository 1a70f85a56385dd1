//! pwapush relay server library
//!
//! Core functionality for the push relay:
//! - VAPID key provisioning
//! - Web Push transport (RFC 8030/8291/8292)
//! - Subscription registration and notification fan-out
//! - HTTP routes

pub mod notifications;
pub mod routes;
