//! Lifecycle Error Types
//!
//! One error enum for the whole order/dispatch lifecycle. Every variant maps
//! to a stable API code and an HTTP status.

use thiserror::Error;

use super::state::{CustomerStatus, EntityKind, OrderStatus};
use crate::core_types::EntityId;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LifecycleError {
    // === Transition Errors ===
    #[error("Invalid {kind} status transition: {from} -> {to}")]
    InvalidTransition {
        kind: EntityKind,
        from: String,
        to: String,
    },

    #[error("A vehicle must be assigned before the order can go in transit")]
    VehicleRequired,

    #[error("Vehicle {0} is not available")]
    VehicleUnavailable(EntityId),

    #[error("Driver {0} is not available")]
    DriverUnavailable(EntityId),

    #[error("Order {order_id} cannot be dispatched while {status}")]
    OrderNotDispatchable {
        order_id: EntityId,
        status: OrderStatus,
    },

    #[error("Cargo exceeds vehicle capacity: {0}")]
    CapacityExceeded(String),

    #[error("A reason is required to cancel a dispatch")]
    ReasonRequired,

    #[error("{kind} {id} cannot be deleted while {status}")]
    IllegalDelete {
        kind: EntityKind,
        id: EntityId,
        status: String,
    },

    #[error("{kind} {id} is assigned to an open dispatch or shipment")]
    ActiveAssignmentExists { kind: EntityKind, id: EntityId },

    #[error("Order {order_id} is managed by dispatch {dispatch_id}")]
    OrderInDispatch {
        order_id: EntityId,
        dispatch_id: EntityId,
    },

    // === Customer Errors ===
    #[error("Customer {customer_id} cannot place orders while {status}")]
    CustomerNotActive {
        customer_id: EntityId,
        status: CustomerStatus,
    },

    #[error("Customer {customer_id} still has {orders} orders")]
    CustomerHasOrders { customer_id: EntityId, orders: u64 },

    // === POD / Tracking Errors ===
    #[error("Order {order_id} does not accept a proof of delivery while {status}")]
    PodNotAllowed {
        order_id: EntityId,
        status: OrderStatus,
    },

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Shipment {0} is not in transit")]
    ShipmentNotInTransit(EntityId),

    #[error("Batch of {size} points exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    // === Request Errors ===
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    // === System Errors ===
    #[error("{kind} {id} was modified concurrently")]
    Conflict { kind: EntityKind, id: String },

    #[error(transparent)]
    Storage(StoreError),

    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl LifecycleError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        LifecycleError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LifecycleError::VehicleRequired => "VEHICLE_REQUIRED",
            LifecycleError::VehicleUnavailable(_) => "VEHICLE_UNAVAILABLE",
            LifecycleError::DriverUnavailable(_) => "DRIVER_UNAVAILABLE",
            LifecycleError::OrderNotDispatchable { .. } => "ORDER_NOT_DISPATCHABLE",
            LifecycleError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            LifecycleError::ReasonRequired => "REASON_REQUIRED",
            LifecycleError::IllegalDelete { .. } => "ILLEGAL_DELETE",
            LifecycleError::ActiveAssignmentExists { .. } => "ACTIVE_ASSIGNMENT_EXISTS",
            LifecycleError::OrderInDispatch { .. } => "ORDER_IN_DISPATCH",
            LifecycleError::CustomerNotActive { .. } => "CUSTOMER_NOT_ACTIVE",
            LifecycleError::CustomerHasOrders { .. } => "CUSTOMER_HAS_ORDERS",
            LifecycleError::PodNotAllowed { .. } => "POD_NOT_ALLOWED",
            LifecycleError::InvalidFile(_) => "INVALID_FILE",
            LifecycleError::ShipmentNotInTransit(_) => "SHIPMENT_NOT_IN_TRANSIT",
            LifecycleError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            LifecycleError::Validation(_) => "VALIDATION_ERROR",
            LifecycleError::NotFound { .. } => "NOT_FOUND",
            LifecycleError::Conflict { .. } => "CONFLICT",
            LifecycleError::Storage(StoreError::Duplicate(_)) => "DUPLICATE",
            LifecycleError::Storage(_) => "STORAGE_ERROR",
            LifecycleError::Io(_) => "FILE_STORAGE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LifecycleError::InvalidTransition { .. }
            | LifecycleError::VehicleRequired
            | LifecycleError::VehicleUnavailable(_)
            | LifecycleError::DriverUnavailable(_)
            | LifecycleError::OrderNotDispatchable { .. }
            | LifecycleError::CapacityExceeded(_)
            | LifecycleError::ReasonRequired
            | LifecycleError::IllegalDelete { .. }
            | LifecycleError::PodNotAllowed { .. }
            | LifecycleError::InvalidFile(_)
            | LifecycleError::ShipmentNotInTransit(_)
            | LifecycleError::BatchTooLarge { .. }
            | LifecycleError::CustomerNotActive { .. }
            | LifecycleError::Validation(_) => 400,
            LifecycleError::NotFound { .. } => 404,
            LifecycleError::ActiveAssignmentExists { .. }
            | LifecycleError::OrderInDispatch { .. }
            | LifecycleError::CustomerHasOrders { .. }
            | LifecycleError::Conflict { .. }
            | LifecycleError::Storage(StoreError::Duplicate(_)) => 409,
            LifecycleError::Storage(_) | LifecycleError::Io(_) => 500,
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => LifecycleError::NotFound {
                kind,
                id: id.to_string(),
            },
            StoreError::Conflict { kind, id } => LifecycleError::Conflict {
                kind,
                id: id.to_string(),
            },
            other => LifecycleError::Storage(other),
        }
    }
}

impl From<sqlx::Error> for LifecycleError {
    fn from(e: sqlx::Error) -> Self {
        LifecycleError::Storage(StoreError::Database(e))
    }
}
