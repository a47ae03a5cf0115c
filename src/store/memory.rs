//! In-memory store
//!
//! `apply` stages every intent on a copy of the tables and swaps the copy in
//! only when the whole batch succeeded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use super::{
    CustomerFilter, CustomerOrderSummary, DispatchFilter, DriverFilter, OrderFilter, StoreError,
    TmsStore, VehicleFilter,
};
use crate::core_types::EntityId;
use crate::lifecycle::{EntityKind, OrderStatus, VehicleStatus, WriteIntent};
use crate::models::{
    Customer, Dispatch, Driver, Order, Pod, Shipment, TrackingPoint, Vehicle,
};

#[derive(Debug, Default, Clone)]
struct Tables {
    customers: FxHashMap<EntityId, Customer>,
    orders: FxHashMap<EntityId, Order>,
    vehicles: FxHashMap<EntityId, Vehicle>,
    drivers: FxHashMap<EntityId, Driver>,
    dispatches: FxHashMap<EntityId, Dispatch>,
    shipments: FxHashMap<EntityId, Shipment>,
    pods: FxHashMap<EntityId, Pod>,
}

/// Look up `id` in `map`, check its status against `expected`, return it for mutation
fn checked<'a, T, S: PartialEq>(
    map: &'a mut FxHashMap<EntityId, T>,
    kind: EntityKind,
    id: EntityId,
    expected: Option<S>,
    status: impl Fn(&T) -> S,
) -> Result<&'a mut T, StoreError> {
    let record = map.get_mut(&id).ok_or(StoreError::NotFound { kind, id })?;
    match expected {
        Some(s) if status(record) != s => Err(StoreError::Conflict { kind, id }),
        _ => Ok(record),
    }
}

/// One page of `items`
fn page<T>(items: Vec<T>, limit: u32, offset: u32) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

fn insert_new<T>(
    map: &mut FxHashMap<EntityId, T>,
    kind: EntityKind,
    id: EntityId,
    record: T,
) -> Result<(), StoreError> {
    if map.contains_key(&id) {
        return Err(StoreError::Duplicate(format!("{kind} {id}")));
    }
    map.insert(id, record);
    Ok(())
}

impl Tables {
    fn plate_taken(&self, plate: &str, except: EntityId) -> bool {
        self.vehicles
            .values()
            .any(|v| v.id != except && v.license_plate == plate)
    }

    fn email_taken(&self, email: &str, except: EntityId) -> bool {
        self.customers
            .values()
            .any(|c| c.id != except && c.email.eq_ignore_ascii_case(email))
    }

    fn open_shipments(&self, pred: impl Fn(&Shipment) -> bool) -> u64 {
        self.shipments
            .values()
            .filter(|s| s.status.is_open() && pred(s))
            .count() as u64
    }

    fn apply(&mut self, intent: &WriteIntent, now: DateTime<Utc>) -> Result<(), StoreError> {
        match intent {
            WriteIntent::CreateShipment(s) => {
                insert_new(&mut self.shipments, EntityKind::Shipment, s.id, s.clone())
            }
            WriteIntent::CreateDispatch(d) => {
                insert_new(&mut self.dispatches, EntityKind::Dispatch, d.id, d.clone())
            }
            WriteIntent::CreatePod(p) => insert_new(&mut self.pods, EntityKind::Pod, p.id, p.clone()),
            WriteIntent::UpdateOrder { id, expected, patch } => {
                let order = checked(&mut self.orders, EntityKind::Order, *id, *expected, |o| o.status)?;
                patch.apply_to(order, now);
                Ok(())
            }
            WriteIntent::UpdateVehicle { id, expected, patch } => {
                if let Some(plate) = &patch.license_plate {
                    if self.plate_taken(plate, *id) {
                        return Err(StoreError::Duplicate(format!("license plate {plate}")));
                    }
                }
                let vehicle =
                    checked(&mut self.vehicles, EntityKind::Vehicle, *id, *expected, |v| v.status)?;
                patch.apply_to(vehicle, now);
                Ok(())
            }
            WriteIntent::UpdateDriver { id, expected, patch } => {
                let driver =
                    checked(&mut self.drivers, EntityKind::Driver, *id, *expected, |d| d.status)?;
                patch.apply_to(driver, now);
                Ok(())
            }
            WriteIntent::UpdateDispatch { id, expected, patch } => {
                let dispatch =
                    checked(&mut self.dispatches, EntityKind::Dispatch, *id, *expected, |d| {
                        d.status
                    })?;
                patch.apply_to(dispatch, now);
                Ok(())
            }
            WriteIntent::UpdateShipment { id, expected, patch } => {
                let shipment =
                    checked(&mut self.shipments, EntityKind::Shipment, *id, *expected, |s| {
                        s.status
                    })?;
                patch.apply_to(shipment, now);
                Ok(())
            }
            WriteIntent::UpdatePod { id, expected, patch } => {
                let pod = checked(&mut self.pods, EntityKind::Pod, *id, *expected, |p| p.status)?;
                patch.apply_to(pod, now);
                Ok(())
            }
            WriteIntent::UpdateCustomer { id, expected, patch } => {
                if let Some(email) = &patch.email {
                    if self.email_taken(email, *id) {
                        return Err(StoreError::Duplicate(format!("email {email}")));
                    }
                }
                let customer =
                    checked(&mut self.customers, EntityKind::Customer, *id, *expected, |c| {
                        c.status
                    })?;
                patch.apply_to(customer, now);
                Ok(())
            }
            WriteIntent::DeleteOrder { id, expected } => {
                checked(&mut self.orders, EntityKind::Order, *id, Some(*expected), |o| o.status)?;
                self.orders.remove(id);
                Ok(())
            }
            WriteIntent::DeleteDriver { id, expected } => {
                checked(&mut self.drivers, EntityKind::Driver, *id, Some(*expected), |d| {
                    d.status
                })?;
                self.drivers.remove(id);
                Ok(())
            }
            WriteIntent::DeleteCustomer { id, expected } => {
                checked(&mut self.customers, EntityKind::Customer, *id, Some(*expected), |c| {
                    c.status
                })?;
                self.customers.remove(id);
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    tracking: RwLock<FxHashMap<EntityId, Vec<TrackingPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TmsStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn customer(&self, id: EntityId) -> Result<Option<Customer>, StoreError> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .customers
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, StoreError> {
        let tables = self.tables.read().await;
        let mut customers: Vec<Customer> = tables
            .customers
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(customers, filter.limit, filter.offset))
    }

    async fn customer_order_summary(
        &self,
        customer_id: EntityId,
    ) -> Result<CustomerOrderSummary, StoreError> {
        let tables = self.tables.read().await;
        let mut summary = CustomerOrderSummary::default();
        for order in tables.orders.values().filter(|o| o.customer_id == customer_id) {
            summary.total_orders += 1;
            if order.status == OrderStatus::Delivered {
                summary.completed_orders += 1;
            }
            summary.total_amount += order.total_amount;
            summary.last_order_at = summary.last_order_at.max(Some(order.created_at));
        }
        Ok(summary)
    }

    async fn order(&self, id: EntityId) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.customer_id.is_none_or(|c| o.customer_id == c))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(orders, filter.limit, filter.offset))
    }

    async fn orders_created_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| from.is_none_or(|f| o.created_at >= f))
            .filter(|o| to.is_none_or(|t| o.created_at <= t))
            .cloned()
            .collect())
    }

    async fn vehicle(&self, id: EntityId) -> Result<Option<Vehicle>, StoreError> {
        Ok(self.tables.read().await.vehicles.get(&id).cloned())
    }

    async fn vehicle_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .vehicles
            .values()
            .find(|v| v.license_plate == plate)
            .cloned())
    }

    async fn vehicles(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>, StoreError> {
        let tables = self.tables.read().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| filter.status.is_none_or(|s| v.status == s))
            .filter(|v| filter.vehicle_type.is_none_or(|t| v.vehicle_type == t))
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(page(vehicles, filter.limit, filter.offset))
    }

    async fn available_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        let tables = self.tables.read().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| v.is_active && v.status == VehicleStatus::Available)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(vehicles)
    }

    async fn driver(&self, id: EntityId) -> Result<Option<Driver>, StoreError> {
        Ok(self.tables.read().await.drivers.get(&id).cloned())
    }

    async fn drivers(&self, filter: &DriverFilter) -> Result<Vec<Driver>, StoreError> {
        let tables = self.tables.read().await;
        let mut drivers: Vec<Driver> = tables
            .drivers
            .values()
            .filter(|d| filter.status.is_none_or(|s| d.status == s))
            .cloned()
            .collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page(drivers, filter.limit, filter.offset))
    }

    async fn dispatch(&self, id: EntityId) -> Result<Option<Dispatch>, StoreError> {
        Ok(self.tables.read().await.dispatches.get(&id).cloned())
    }

    async fn dispatches(&self, filter: &DispatchFilter) -> Result<Vec<Dispatch>, StoreError> {
        let tables = self.tables.read().await;
        let mut dispatches: Vec<Dispatch> = tables
            .dispatches
            .values()
            .filter(|d| filter.status.is_none_or(|s| d.status == s))
            .filter(|d| filter.vehicle_id.is_none_or(|v| d.vehicle_id == v))
            .filter(|d| filter.driver_id.is_none_or(|v| d.driver_id == v))
            .cloned()
            .collect();
        dispatches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(dispatches, filter.limit, filter.offset))
    }

    async fn shipment(&self, id: EntityId) -> Result<Option<Shipment>, StoreError> {
        Ok(self.tables.read().await.shipments.get(&id).cloned())
    }

    async fn shipments_for_dispatch(
        &self,
        dispatch_id: EntityId,
    ) -> Result<Vec<Shipment>, StoreError> {
        let tables = self.tables.read().await;
        let mut shipments: Vec<Shipment> = tables
            .shipments
            .values()
            .filter(|s| s.dispatch_id == Some(dispatch_id))
            .cloned()
            .collect();
        shipments.sort_by_key(|s| s.sequence);
        Ok(shipments)
    }

    async fn shipments_for_order(&self, order_id: EntityId) -> Result<Vec<Shipment>, StoreError> {
        let tables = self.tables.read().await;
        let mut shipments: Vec<Shipment> = tables
            .shipments
            .values()
            .filter(|s| s.order_id == order_id)
            .cloned()
            .collect();
        shipments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(shipments)
    }

    async fn open_shipments_for_driver(&self, driver_id: EntityId) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.open_shipments(|s| s.driver_id == Some(driver_id)))
    }

    async fn open_shipments_for_vehicle(&self, vehicle_id: EntityId) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.open_shipments(|s| s.vehicle_id == vehicle_id))
    }

    async fn pod(&self, id: EntityId) -> Result<Option<Pod>, StoreError> {
        Ok(self.tables.read().await.pods.get(&id).cloned())
    }

    async fn tracking_points(
        &self,
        shipment_id: EntityId,
    ) -> Result<Vec<TrackingPoint>, StoreError> {
        let mut points = self
            .tracking
            .read()
            .await
            .get(&shipment_id)
            .cloned()
            .unwrap_or_default();
        points.sort_by_key(|p| p.recorded_at);
        Ok(points)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        insert_new(&mut tables.orders, EntityKind::Order, order.id, order.clone())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.plate_taken(&vehicle.license_plate, vehicle.id) {
            return Err(StoreError::Duplicate(format!(
                "license plate {}",
                vehicle.license_plate
            )));
        }
        insert_new(&mut tables.vehicles, EntityKind::Vehicle, vehicle.id, vehicle.clone())
    }

    async fn insert_driver(&self, driver: &Driver) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        insert_new(&mut tables.drivers, EntityKind::Driver, driver.id, driver.clone())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&customer.email, customer.id) {
            return Err(StoreError::Duplicate(format!("email {}", customer.email)));
        }
        insert_new(&mut tables.customers, EntityKind::Customer, customer.id, customer.clone())
    }

    async fn append_tracking(&self, points: &[TrackingPoint]) -> Result<(), StoreError> {
        let mut tracking = self.tracking.write().await;
        for p in points {
            tracking.entry(p.shipment_id).or_default().push(p.clone());
        }
        Ok(())
    }

    async fn apply(&self, intents: &[WriteIntent]) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        for intent in intents {
            staged.apply(intent, now)?;
        }
        *tables = staged;
        Ok(())
    }
}
