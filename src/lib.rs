//! TMS Core - transportation management lifecycle backend
//!
//! Orders, vehicles, drivers, multi-order dispatches, proof of delivery and
//! GPS tracking, with every status change checked against a fixed
//! transition table and its side effects written in one transaction.
//!
//! # Modules
//!
//! - [`core_types`] - Entity ids and document numbers
//! - [`models`] - Records, drafts and partial-update patches
//! - [`lifecycle`] - Status machines, effect planning and the service
//! - [`pricing`] - Order price quotes
//! - [`tracking`] - GPS preprocessing, statistics and alerts
//! - [`pod`] - Proof-of-delivery files and review
//! - [`reports`] - Order and customer statistics
//! - [`store`] - `TmsStore` seam with PostgreSQL and in-memory backends
//! - [`gateway`] - axum HTTP API

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod db;
pub mod gateway;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod pod;
pub mod pricing;
pub mod reports;
pub mod store;
pub mod tracking;

// Convenient re-exports at crate root
pub use core_types::EntityId;
pub use lifecycle::{LifecycleError, LifecycleService};
pub use store::{MemoryStore, PgStore, TmsStore};
