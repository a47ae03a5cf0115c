//! Lifecycle Service
//!
//! Load → plan → apply for every mutating operation. Planning is delegated to
//! the pure planners; this layer only fetches what they need and hands the
//! resulting intents to the store in one batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::effects::{
    DispatchLeg, DispatchTransitionContext, OrderTransitionContext, WriteIntent,
    ensure_can_order, plan_customer_delete, plan_customer_status, plan_customer_update,
    plan_dispatch_create, plan_dispatch_transition, plan_driver_delete, plan_driver_update,
    plan_order_delete, plan_order_transition, plan_vehicle_retire, plan_vehicle_update,
    validate_customer_names,
};
use super::error::LifecycleError;
use super::state::{CustomerStatus, DispatchStatus, EntityKind, OrderStatus};
use super::transition::next_status_names;
use crate::core_types::EntityId;
use crate::models::{
    Customer, CustomerPatch, Dispatch, Driver, DriverPatch, NewCustomer, NewDispatch, NewDriver,
    NewOrder, NewVehicle, Order, Pod, Shipment, TrackingPoint, Vehicle, VehiclePatch,
};
use crate::pod::{PodDetails, PodFileStore, PodReview, ensure_pod_allowed, plan_pod_review, plan_pod_upload};
use crate::pricing;
use crate::reports::{CustomerStatistics, OrderStatistics};
use crate::store::{
    CustomerFilter, CustomerOrderSummary, DispatchFilter, DriverFilter, OrderFilter, StoreError,
    TmsStore, VehicleFilter,
};
use crate::tracking::{
    LocationUpdate, TrackingAlert, TrackingStatistics, plan_ingest, statistics,
};

/// Order with the statuses it may move to next
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub can_update: Vec<String>,
}

/// Customer with order totals and the statuses it may move to next
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetail {
    pub customer: Customer,
    pub orders: CustomerOrderSummary,
    pub can_update: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OrderStatusCommand {
    pub status: OrderStatus,
    pub vehicle_id: Option<EntityId>,
    pub driver_id: Option<EntityId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderTransitionOutcome {
    pub order: Order,
    /// Set when the transition started a shipment
    pub shipment: Option<Shipment>,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchDetail {
    pub dispatch: Dispatch,
    pub shipments: Vec<Shipment>,
    pub can_update: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchStatusCommand {
    pub status: Option<DispatchStatus>,
    pub reason: Option<String>,
    pub actual_distance: Option<Decimal>,
    pub actual_duration: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct PodUpload {
    pub order_id: EntityId,
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub details: PodDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub shipment_id: EntityId,
    pub accepted: usize,
    pub statistics: TrackingStatistics,
    pub alerts: Vec<TrackingAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingSummary {
    pub shipment: Shipment,
    pub statistics: TrackingStatistics,
    pub latest: Option<TrackingPoint>,
}

pub struct LifecycleService {
    store: Arc<dyn TmsStore>,
    files: PodFileStore,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn TmsStore>, files: PodFileStore) -> Self {
        Self { store, files }
    }

    pub fn store(&self) -> &Arc<dyn TmsStore> {
        &self.store
    }

    // ========================================================================
    // Loaders
    // ========================================================================

    async fn load_order(&self, id: EntityId) -> Result<Order, LifecycleError> {
        self.store
            .order(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Order, id))
    }

    async fn load_customer(&self, id: EntityId) -> Result<Customer, LifecycleError> {
        self.store
            .customer(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Customer, id))
    }

    async fn load_vehicle(&self, id: EntityId) -> Result<Vehicle, LifecycleError> {
        self.store
            .vehicle(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Vehicle, id))
    }

    async fn load_driver(&self, id: EntityId) -> Result<Driver, LifecycleError> {
        self.store
            .driver(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Driver, id))
    }

    async fn load_dispatch(&self, id: EntityId) -> Result<Dispatch, LifecycleError> {
        self.store
            .dispatch(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Dispatch, id))
    }

    async fn load_shipment(&self, id: EntityId) -> Result<Shipment, LifecycleError> {
        self.store
            .shipment(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Shipment, id))
    }

    async fn load_pod(&self, id: EntityId) -> Result<Pod, LifecycleError> {
        self.store
            .pod(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Pod, id))
    }

    async fn commit(&self, intents: &[WriteIntent]) -> Result<(), LifecycleError> {
        debug!(
            intents = ?intents.iter().map(WriteIntent::label).collect::<Vec<_>>(),
            "Applying write batch"
        );
        self.store.apply(intents).await?;
        Ok(())
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Price and store a new PENDING order for an ACTIVE customer
    pub async fn create_order(
        &self,
        draft: NewOrder,
        actor: Option<String>,
    ) -> Result<Order, LifecycleError> {
        let customer = self.load_customer(draft.customer_id).await?;
        ensure_can_order(&customer)?;
        let total = pricing::quote(
            draft.distance_km.unwrap_or(Decimal::ZERO),
            &draft.cargo,
            draft.priority,
        );
        let order = Order::pending(draft, total, actor, Utc::now());
        self.store.insert_order(&order).await?;
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_amount = %order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: EntityId) -> Result<OrderDetail, LifecycleError> {
        let order = self.load_order(id).await?;
        Ok(OrderDetail {
            can_update: next_status_names(order.status),
            order,
        })
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, LifecycleError> {
        Ok(self.store.orders(filter).await?)
    }

    /// Totals over orders created inside `[from, to]`
    pub async fn order_statistics(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<OrderStatistics, LifecycleError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(LifecycleError::Validation(
                    "start date must not be after end date".to_string(),
                ));
            }
        }
        let orders = self.store.orders_created_between(from, to).await?;
        Ok(OrderStatistics::collect(&orders, from, to))
    }

    pub async fn change_order_status(
        &self,
        id: EntityId,
        cmd: OrderStatusCommand,
        actor: Option<String>,
    ) -> Result<OrderTransitionOutcome, LifecycleError> {
        let order = self.load_order(id).await?;
        let vehicle = match cmd.vehicle_id {
            Some(vehicle_id) => Some(self.load_vehicle(vehicle_id).await?),
            None => None,
        };
        if let Some(driver_id) = cmd.driver_id {
            self.load_driver(driver_id).await?;
        }
        let shipments = self.store.shipments_for_order(id).await?;

        let ctx = OrderTransitionContext {
            vehicle: vehicle.as_ref(),
            driver_id: cmd.driver_id,
            shipments: &shipments,
            actor,
        };
        let intents = plan_order_transition(&order, cmd.status, &ctx, Utc::now())?;
        if intents.is_empty() {
            debug!(order_id = %id, status = %order.status, "Order already in requested status");
            return Ok(OrderTransitionOutcome {
                order,
                shipment: None,
                changed: false,
            });
        }

        let shipment = intents.iter().find_map(|i| match i {
            WriteIntent::CreateShipment(s) => Some(s.clone()),
            _ => None,
        });
        self.commit(&intents).await?;

        let updated = self.load_order(id).await?;
        info!(
            order_id = %id,
            from = %order.status,
            to = %updated.status,
            shipment = ?shipment.as_ref().map(|s| s.shipment_number.as_str()),
            "Order status changed"
        );
        Ok(OrderTransitionOutcome {
            order: updated,
            shipment,
            changed: true,
        })
    }

    pub async fn delete_order(&self, id: EntityId) -> Result<(), LifecycleError> {
        let order = self.load_order(id).await?;
        let intents = plan_order_delete(&order)?;
        self.commit(&intents).await?;
        info!(order_id = %id, order_number = %order.order_number, "Order deleted");
        Ok(())
    }

    // ========================================================================
    // Vehicles / Drivers
    // ========================================================================

    pub async fn register_vehicle(&self, draft: NewVehicle) -> Result<Vehicle, LifecycleError> {
        if let Some(driver_id) = draft.driver_id {
            self.load_driver(driver_id).await?;
        }
        let vehicle = Vehicle::register(draft, Utc::now());
        self.store.insert_vehicle(&vehicle).await?;
        info!(vehicle_id = %vehicle.id, plate = %vehicle.license_plate, "Vehicle registered");
        Ok(vehicle)
    }

    pub async fn get_vehicle(&self, id: EntityId) -> Result<Vehicle, LifecycleError> {
        self.load_vehicle(id).await
    }

    pub async fn available_vehicles(&self) -> Result<Vec<Vehicle>, LifecycleError> {
        Ok(self.store.available_vehicles().await?)
    }

    pub async fn list_vehicles(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>, LifecycleError> {
        Ok(self.store.vehicles(filter).await?)
    }

    /// Manual edit: profile fields, AVAILABLE/MAINTENANCE, driver assignment
    pub async fn update_vehicle(
        &self,
        id: EntityId,
        patch: VehiclePatch,
    ) -> Result<Vehicle, LifecycleError> {
        let vehicle = self.load_vehicle(id).await?;
        if let Some(plate) = patch.license_plate.as_deref() {
            if let Some(other) = self.store.vehicle_by_plate(plate).await? {
                if other.id != id {
                    return Err(StoreError::Duplicate(format!("license plate {plate}")).into());
                }
            }
        }
        if let Some(Some(driver_id)) = patch.driver_id {
            self.load_driver(driver_id).await?;
        }
        let open = self.store.open_shipments_for_vehicle(id).await?;
        let intents = plan_vehicle_update(&vehicle, patch, open)?;
        if intents.is_empty() {
            return Ok(vehicle);
        }
        self.commit(&intents).await?;
        let updated = self.load_vehicle(id).await?;
        info!(
            vehicle_id = %id,
            plate = %updated.license_plate,
            status = %updated.status,
            "Vehicle updated"
        );
        Ok(updated)
    }

    /// Soft delete
    pub async fn retire_vehicle(&self, id: EntityId) -> Result<Vehicle, LifecycleError> {
        let vehicle = self.load_vehicle(id).await?;
        if vehicle.status == super::state::VehicleStatus::InTransit {
            warn!(vehicle_id = %id, "Retiring a vehicle that is in transit");
        }
        self.commit(&plan_vehicle_retire(&vehicle)).await?;
        info!(vehicle_id = %id, plate = %vehicle.license_plate, "Vehicle retired");
        self.load_vehicle(id).await
    }

    pub async fn register_driver(&self, draft: NewDriver) -> Result<Driver, LifecycleError> {
        let driver = Driver::register(draft, Utc::now());
        self.store.insert_driver(&driver).await?;
        info!(driver_id = %driver.id, "Driver registered");
        Ok(driver)
    }

    pub async fn get_driver(&self, id: EntityId) -> Result<Driver, LifecycleError> {
        self.load_driver(id).await
    }

    pub async fn list_drivers(&self, filter: &DriverFilter) -> Result<Vec<Driver>, LifecycleError> {
        Ok(self.store.drivers(filter).await?)
    }

    pub async fn update_driver(
        &self,
        id: EntityId,
        patch: DriverPatch,
    ) -> Result<Driver, LifecycleError> {
        let driver = self.load_driver(id).await?;
        let intents = plan_driver_update(&driver, patch)?;
        if intents.is_empty() {
            return Ok(driver);
        }
        self.commit(&intents).await?;
        let updated = self.load_driver(id).await?;
        info!(driver_id = %id, status = %updated.status, "Driver updated");
        Ok(updated)
    }

    pub async fn delete_driver(&self, id: EntityId) -> Result<(), LifecycleError> {
        let driver = self.load_driver(id).await?;
        let open = self.store.open_shipments_for_driver(id).await?;
        let intents = plan_driver_delete(&driver, open)?;
        self.commit(&intents).await?;
        info!(driver_id = %id, "Driver deleted");
        Ok(())
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub async fn create_customer(
        &self,
        draft: NewCustomer,
        actor: Option<String>,
    ) -> Result<Customer, LifecycleError> {
        let customer = Customer::register(draft, actor, Utc::now());
        validate_customer_names(&customer)?;
        if self.store.customer_by_email(&customer.email).await?.is_some() {
            return Err(StoreError::Duplicate(format!("email {}", customer.email)).into());
        }
        self.store.insert_customer(&customer).await?;
        info!(
            customer_id = %customer.id,
            customer_number = %customer.customer_number,
            customer_type = %customer.customer_type,
            "Customer created"
        );
        Ok(customer)
    }

    pub async fn get_customer(&self, id: EntityId) -> Result<CustomerDetail, LifecycleError> {
        let customer = self.load_customer(id).await?;
        let orders = self.store.customer_order_summary(id).await?;
        Ok(CustomerDetail {
            can_update: next_status_names(customer.status),
            customer,
            orders,
        })
    }

    pub async fn list_customers(
        &self,
        filter: &CustomerFilter,
    ) -> Result<Vec<Customer>, LifecycleError> {
        Ok(self.store.customers(filter).await?)
    }

    pub async fn update_customer(
        &self,
        id: EntityId,
        patch: CustomerPatch,
        actor: Option<String>,
    ) -> Result<Customer, LifecycleError> {
        let customer = self.load_customer(id).await?;
        if let Some(email) = patch.email.as_deref() {
            if let Some(other) = self.store.customer_by_email(email).await? {
                if other.id != id {
                    return Err(StoreError::Duplicate(format!("email {email}")).into());
                }
            }
        }
        let intents = plan_customer_update(
            &customer,
            CustomerPatch {
                updated_by: actor,
                ..patch
            },
        )?;
        if intents.is_empty() {
            return Ok(customer);
        }
        self.commit(&intents).await?;
        info!(customer_id = %id, "Customer updated");
        self.load_customer(id).await
    }

    pub async fn change_customer_status(
        &self,
        id: EntityId,
        status: CustomerStatus,
        reason: Option<&str>,
        actor: Option<String>,
    ) -> Result<Customer, LifecycleError> {
        let customer = self.load_customer(id).await?;
        let intents = plan_customer_status(&customer, status, reason, actor, Utc::now())?;
        if intents.is_empty() {
            debug!(customer_id = %id, status = %customer.status, "Customer already in requested status");
            return Ok(customer);
        }
        self.commit(&intents).await?;
        info!(customer_id = %id, from = %customer.status, to = %status, "Customer status changed");
        self.load_customer(id).await
    }

    pub async fn delete_customer(&self, id: EntityId) -> Result<(), LifecycleError> {
        let customer = self.load_customer(id).await?;
        let summary = self.store.customer_order_summary(id).await?;
        let intents = plan_customer_delete(&customer, summary.total_orders)?;
        self.commit(&intents).await?;
        info!(customer_id = %id, customer_number = %customer.customer_number, "Customer deleted");
        Ok(())
    }

    pub async fn customer_statistics(&self) -> Result<CustomerStatistics, LifecycleError> {
        let customers = self.store.customers(&CustomerFilter::everything()).await?;
        let orders = self.store.orders_created_between(None, None).await?;
        Ok(CustomerStatistics::collect(&customers, &orders))
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    pub async fn create_dispatch(&self, draft: NewDispatch) -> Result<DispatchDetail, LifecycleError> {
        let mut seen = rustc_hash::FxHashSet::default();
        if let Some(dup) = draft.order_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(LifecycleError::Validation(format!(
                "order {dup} listed more than once"
            )));
        }

        let mut orders = Vec::with_capacity(draft.order_ids.len());
        let mut existing = Vec::new();
        for order_id in &draft.order_ids {
            orders.push(self.load_order(*order_id).await?);
            existing.extend(self.store.shipments_for_order(*order_id).await?);
        }
        let vehicle = self.load_vehicle(draft.vehicle_id).await?;
        let driver = self.load_driver(draft.driver_id).await?;

        let (dispatch, intents) =
            plan_dispatch_create(&draft, &orders, &existing, &vehicle, &driver, Utc::now())?;
        self.commit(&intents).await?;
        info!(
            dispatch_id = %dispatch.id,
            dispatch_number = %dispatch.dispatch_number,
            orders = orders.len(),
            vehicle = %vehicle.license_plate,
            "Dispatch scheduled"
        );
        self.get_dispatch(dispatch.id).await
    }

    pub async fn get_dispatch(&self, id: EntityId) -> Result<DispatchDetail, LifecycleError> {
        let dispatch = self.load_dispatch(id).await?;
        let shipments = self.store.shipments_for_dispatch(id).await?;
        Ok(DispatchDetail {
            can_update: next_status_names(dispatch.status),
            dispatch,
            shipments,
        })
    }

    pub async fn list_dispatches(
        &self,
        filter: &DispatchFilter,
    ) -> Result<Vec<Dispatch>, LifecycleError> {
        Ok(self.store.dispatches(filter).await?)
    }

    pub async fn change_dispatch_status(
        &self,
        id: EntityId,
        cmd: DispatchStatusCommand,
        actor: Option<String>,
    ) -> Result<DispatchDetail, LifecycleError> {
        let status = cmd
            .status
            .ok_or_else(|| LifecycleError::Validation("status is required".to_string()))?;
        let dispatch = self.load_dispatch(id).await?;

        let mut legs = Vec::new();
        for shipment in self.store.shipments_for_dispatch(id).await? {
            let order = self.load_order(shipment.order_id).await?;
            legs.push(DispatchLeg { shipment, order });
        }

        let ctx = DispatchTransitionContext {
            legs: &legs,
            reason: cmd.reason,
            actual_distance: cmd.actual_distance,
            actual_duration: cmd.actual_duration,
            actor,
        };
        let intents = plan_dispatch_transition(&dispatch, status, &ctx, Utc::now())?;
        if intents.is_empty() {
            debug!(dispatch_id = %id, status = %dispatch.status, "Dispatch already in requested status");
        } else {
            self.commit(&intents).await?;
            info!(
                dispatch_id = %id,
                from = %dispatch.status,
                to = %status,
                writes = intents.len(),
                "Dispatch status changed"
            );
        }
        self.get_dispatch(id).await
    }

    // ========================================================================
    // Proof of delivery
    // ========================================================================

    pub async fn upload_pod(
        &self,
        upload: PodUpload,
        actor: Option<String>,
    ) -> Result<Pod, LifecycleError> {
        let order = self.load_order(upload.order_id).await?;
        ensure_pod_allowed(&order)?;
        let shipments = self.store.shipments_for_order(order.id).await?;

        let stored = self
            .files
            .save(order.id, &upload.file_name, &upload.mime_type, &upload.content)
            .await?;
        let planned = plan_pod_upload(
            &order,
            &shipments,
            stored.clone(),
            upload.details,
            actor,
            Utc::now(),
        );
        let (pod, intents) = match planned {
            Ok(plan) => plan,
            Err(e) => {
                self.files.discard(&stored).await;
                return Err(e);
            }
        };
        if let Err(e) = self.commit(&intents).await {
            self.files.discard(&stored).await;
            return Err(e);
        }

        info!(
            pod_id = %pod.id,
            pod_number = %pod.pod_number,
            order_id = %order.id,
            checksum = %pod.checksum,
            "POD uploaded"
        );
        Ok(pod)
    }

    pub async fn get_pod(&self, id: EntityId) -> Result<Pod, LifecycleError> {
        self.load_pod(id).await
    }

    pub async fn review_pod(&self, id: EntityId, review: PodReview) -> Result<Pod, LifecycleError> {
        let pod = self.load_pod(id).await?;
        let order = self.load_order(pod.order_id).await?;
        let intents = plan_pod_review(&pod, &order, &review, Utc::now())?;
        if !intents.is_empty() {
            self.commit(&intents).await?;
        }
        let reviewed = self.load_pod(id).await?;
        info!(
            pod_id = %id,
            status = %reviewed.status,
            reviewer = %review.reviewer(),
            reason = ?reviewed.rejection_reason,
            "POD reviewed"
        );
        Ok(reviewed)
    }

    // ========================================================================
    // Tracking
    // ========================================================================

    pub async fn ingest_tracking(
        &self,
        shipment_id: EntityId,
        updates: &[LocationUpdate],
    ) -> Result<IngestReport, LifecycleError> {
        let shipment = self.load_shipment(shipment_id).await?;
        let plan = plan_ingest(&shipment, updates, Utc::now())?;
        self.store.append_tracking(&plan.points).await?;

        for alert in &plan.alerts {
            warn!(
                shipment_id = %shipment_id,
                alert = ?alert.alert_type,
                severity = ?alert.severity,
                "{}", alert.message
            );
        }
        info!(
            shipment_id = %shipment_id,
            points = plan.points.len(),
            distance_km = plan.statistics.distance_km,
            "Tracking batch stored"
        );
        Ok(IngestReport {
            shipment_id,
            accepted: plan.points.len(),
            statistics: plan.statistics,
            alerts: plan.alerts,
        })
    }

    pub async fn shipment_tracking(
        &self,
        shipment_id: EntityId,
    ) -> Result<TrackingSummary, LifecycleError> {
        let shipment = self.load_shipment(shipment_id).await?;
        let points = self.store.tracking_points(shipment_id).await?;
        Ok(TrackingSummary {
            shipment,
            statistics: statistics(&points),
            latest: points.last().cloned(),
        })
    }
}
