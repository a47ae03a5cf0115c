//! Persistence
//!
//! [`TmsStore`] is the only seam between the lifecycle service and storage.
//! Two implementations:
//! - [`PgStore`]: PostgreSQL via sqlx, one transaction per `apply`
//! - [`MemoryStore`]: in-process tables, used when no database is configured
//!   and by the tests
//!
//! `apply` is all-or-nothing. An update whose `expected` status no longer
//! matches aborts the whole batch with [`StoreError::Conflict`].

pub mod memory;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::core_types::EntityId;
use crate::lifecycle::{
    CustomerStatus, DispatchStatus, DriverStatus, EntityKind, OrderStatus, VehicleStatus,
    WriteIntent,
};
use crate::models::{
    Customer, CustomerType, Dispatch, Driver, Order, Pod, Shipment, TrackingPoint, Vehicle,
    VehicleType,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("{kind} {id} was modified concurrently")]
    Conflict { kind: EntityKind, id: EntityId },

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Page size when the caller gives none
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Order listing filter
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<EntityId>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            customer_id: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Customer listing filter. `search` matches number, names, email or phone.
#[derive(Debug, Clone)]
pub struct CustomerFilter {
    pub customer_type: Option<CustomerType>,
    pub status: Option<CustomerStatus>,
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for CustomerFilter {
    fn default() -> Self {
        Self {
            customer_type: None,
            status: None,
            search: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl CustomerFilter {
    /// Every customer, unpaged
    pub fn everything() -> Self {
        Self {
            limit: u32::MAX,
            ..Default::default()
        }
    }

    pub fn matches(&self, c: &Customer) -> bool {
        let search = self.search.as_deref().map(str::to_lowercase);
        self.customer_type.is_none_or(|t| c.customer_type == t)
            && self.status.is_none_or(|s| c.status == s)
            && search.as_deref().is_none_or(|needle| {
                [
                    Some(c.customer_number.as_str()),
                    c.company_name.as_deref(),
                    c.first_name.as_deref(),
                    c.last_name.as_deref(),
                    Some(c.email.as_str()),
                    Some(c.phone.as_str()),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle))
            })
    }
}

/// Vehicle listing filter; includes retired vehicles unless `status` says otherwise
#[derive(Debug, Clone)]
pub struct VehicleFilter {
    pub status: Option<VehicleStatus>,
    pub vehicle_type: Option<VehicleType>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for VehicleFilter {
    fn default() -> Self {
        Self {
            status: None,
            vehicle_type: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriverFilter {
    pub status: Option<DriverStatus>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for DriverFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchFilter {
    pub status: Option<DispatchStatus>,
    pub vehicle_id: Option<EntityId>,
    pub driver_id: Option<EntityId>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for DispatchFilter {
    fn default() -> Self {
        Self {
            status: None,
            vehicle_id: None,
            driver_id: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Order totals for one customer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerOrderSummary {
    pub total_orders: u64,
    pub completed_orders: u64,
    pub total_amount: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TmsStore: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StoreError>;

    // === Reads ===
    async fn customer(&self, id: EntityId) -> Result<Option<Customer>, StoreError>;
    async fn customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError>;
    /// Newest first
    async fn customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, StoreError>;
    async fn customer_order_summary(
        &self,
        customer_id: EntityId,
    ) -> Result<CustomerOrderSummary, StoreError>;
    async fn order(&self, id: EntityId) -> Result<Option<Order>, StoreError>;
    /// Newest first
    async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;
    /// Orders created inside `[from, to]`; an open end is unbounded
    async fn orders_created_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Order>, StoreError>;
    async fn vehicle(&self, id: EntityId) -> Result<Option<Vehicle>, StoreError>;
    async fn vehicle_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, StoreError>;
    /// By licence plate
    async fn vehicles(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>, StoreError>;
    /// Active vehicles in AVAILABLE status
    async fn available_vehicles(&self) -> Result<Vec<Vehicle>, StoreError>;
    async fn driver(&self, id: EntityId) -> Result<Option<Driver>, StoreError>;
    /// By name
    async fn drivers(&self, filter: &DriverFilter) -> Result<Vec<Driver>, StoreError>;
    async fn dispatch(&self, id: EntityId) -> Result<Option<Dispatch>, StoreError>;
    /// Newest first
    async fn dispatches(&self, filter: &DispatchFilter) -> Result<Vec<Dispatch>, StoreError>;
    async fn shipment(&self, id: EntityId) -> Result<Option<Shipment>, StoreError>;
    /// In sequence order
    async fn shipments_for_dispatch(
        &self,
        dispatch_id: EntityId,
    ) -> Result<Vec<Shipment>, StoreError>;
    /// Oldest first
    async fn shipments_for_order(&self, order_id: EntityId) -> Result<Vec<Shipment>, StoreError>;
    /// SCHEDULED or IN_TRANSIT shipments assigned to the driver
    async fn open_shipments_for_driver(&self, driver_id: EntityId) -> Result<u64, StoreError>;
    /// SCHEDULED or IN_TRANSIT shipments carried by the vehicle
    async fn open_shipments_for_vehicle(&self, vehicle_id: EntityId) -> Result<u64, StoreError>;
    async fn pod(&self, id: EntityId) -> Result<Option<Pod>, StoreError>;
    /// Ordered by `recorded_at`, whatever order the points arrived in
    async fn tracking_points(
        &self,
        shipment_id: EntityId,
    ) -> Result<Vec<TrackingPoint>, StoreError>;

    // === Writes ===
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;
    /// Fails with `Duplicate` on a taken licence plate
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), StoreError>;
    async fn insert_driver(&self, driver: &Driver) -> Result<(), StoreError>;
    /// Fails with `Duplicate` on a taken email
    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError>;
    async fn append_tracking(&self, points: &[TrackingPoint]) -> Result<(), StoreError>;

    /// Execute all intents atomically, in order
    async fn apply(&self, intents: &[WriteIntent]) -> Result<(), StoreError>;
}
