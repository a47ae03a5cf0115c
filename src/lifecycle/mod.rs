//! Order / Dispatch Lifecycle
//!
//! # State Machines
//!
//! ```text
//! Order:    PENDING → CONFIRMED → IN_TRANSIT → DELIVERED
//!              ↓          ↓         ↓    ↑
//!          CANCELLED  CANCELLED   RETURNED
//!
//! Dispatch: SCHEDULED → DEPARTED → IN_TRANSIT → ARRIVED → COMPLETED
//!                 ↓          ↓          ↓
//!             CANCELLED (reason required)
//!
//! Customer: ACTIVE ⇄ INACTIVE, ACTIVE ⇄ SUSPENDED, ACTIVE/SUSPENDED → BLACKLISTED → ACTIVE
//! ```
//!
//! # Flow
//!
//! Every mutating request follows the same three steps:
//!
//! 1. **Load** the records the change touches from the store
//! 2. **Plan**: validate the transition ([`transition`]) and derive the
//!    ordered write list ([`effects`]); pure, no I/O
//! 3. **Apply** the list atomically with status compare-and-swap
//!
//! A request that loses a race fails with `Conflict` and writes nothing.

pub mod effects;
pub mod error;
pub mod service;
pub mod state;
pub mod transition;

// Re-exports for convenience
pub use effects::{
    DispatchLeg, DispatchTransitionContext, OrderTransitionContext, WriteIntent,
    ensure_can_order, plan_customer_delete, plan_customer_status, plan_customer_update,
    plan_dispatch_create, plan_dispatch_transition, plan_driver_delete, plan_driver_update,
    plan_order_delete, plan_order_transition, plan_vehicle_retire, plan_vehicle_update,
    validate_customer_names,
};
pub use error::LifecycleError;
pub use service::{
    CustomerDetail, DispatchDetail, DispatchStatusCommand, IngestReport, LifecycleService, OrderDetail,
    OrderStatusCommand, OrderTransitionOutcome, PodUpload, TrackingSummary,
};
pub use state::{
    CustomerStatus, DispatchStatus, DriverStatus, EntityKind, OrderStatus, PodStatus,
    ShipmentStatus, UnknownStatus, VehicleStatus,
};
pub use transition::{StatusChange, StatusMachine, Transition, check_transition};
