//! `pwapush` Core Library
//!
//! Shared functionality for the push relay:
//! - Subscription and notification message types
//! - Admission validation for inbound records
//! - The `SubscriptionRepository` interface and its in-memory store
//! - Common error types and tracing setup

pub mod error;
pub mod message;
pub mod store;
pub mod subscription;
pub mod tracing_init;

pub use error::{Error, Result, ValidationError};
pub use message::NotificationMessage;
pub use store::{InMemorySubscriptionStore, SubscriptionRepository};
pub use subscription::{Subscription, SubscriptionCandidate, SubscriptionKeys};
