//! Derived-Effect Applier
//!
//! Turns a validated status change plus the records it touches into an
//! ordered list of [`WriteIntent`]s. Planning is pure: the caller loads the
//! records, plans, then hands the whole list to `TmsStore::apply`, which
//! executes it atomically.
//!
//! Every update that depends on a prior status carries it as `expected`, so
//! the store can reject the batch if another writer got there first.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::error::LifecycleError;
use super::state::{
    CustomerStatus, DispatchStatus, DriverStatus, EntityKind, OrderStatus, PodStatus,
    ShipmentStatus, VehicleStatus,
};
use super::transition::{Transition, check_transition};
use crate::core_types::EntityId;
use crate::models::{
    Customer, CustomerPatch, CustomerType, DEFAULT_TRANSIT_HOURS, Dispatch, DispatchPatch, Driver, DriverPatch,
    NewDispatch, Order, OrderPatch, Pod, PodPatch, Shipment, ShipmentPatch, Vehicle,
    VehiclePatch,
};

/// One persistence-level write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteIntent {
    CreateShipment(Shipment),
    CreateDispatch(Dispatch),
    CreatePod(Pod),
    UpdateOrder {
        id: EntityId,
        expected: Option<OrderStatus>,
        patch: OrderPatch,
    },
    UpdateVehicle {
        id: EntityId,
        expected: Option<VehicleStatus>,
        patch: VehiclePatch,
    },
    UpdateDriver {
        id: EntityId,
        expected: Option<DriverStatus>,
        patch: DriverPatch,
    },
    UpdateDispatch {
        id: EntityId,
        expected: Option<DispatchStatus>,
        patch: DispatchPatch,
    },
    UpdateShipment {
        id: EntityId,
        expected: Option<ShipmentStatus>,
        patch: ShipmentPatch,
    },
    UpdatePod {
        id: EntityId,
        expected: Option<PodStatus>,
        patch: PodPatch,
    },
    UpdateCustomer {
        id: EntityId,
        expected: Option<CustomerStatus>,
        patch: CustomerPatch,
    },
    DeleteOrder {
        id: EntityId,
        expected: OrderStatus,
    },
    DeleteDriver {
        id: EntityId,
        expected: DriverStatus,
    },
    DeleteCustomer {
        id: EntityId,
        expected: CustomerStatus,
    },
}

impl WriteIntent {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            WriteIntent::CreateShipment(_) => "create_shipment",
            WriteIntent::CreateDispatch(_) => "create_dispatch",
            WriteIntent::CreatePod(_) => "create_pod",
            WriteIntent::UpdateOrder { .. } => "update_order",
            WriteIntent::UpdateVehicle { .. } => "update_vehicle",
            WriteIntent::UpdateDriver { .. } => "update_driver",
            WriteIntent::UpdateDispatch { .. } => "update_dispatch",
            WriteIntent::UpdateShipment { .. } => "update_shipment",
            WriteIntent::UpdatePod { .. } => "update_pod",
            WriteIntent::UpdateCustomer { .. } => "update_customer",
            WriteIntent::DeleteOrder { .. } => "delete_order",
            WriteIntent::DeleteDriver { .. } => "delete_driver",
            WriteIntent::DeleteCustomer { .. } => "delete_customer",
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            WriteIntent::CreateShipment(_) | WriteIntent::UpdateShipment { .. } => {
                EntityKind::Shipment
            }
            WriteIntent::CreateDispatch(_) | WriteIntent::UpdateDispatch { .. } => {
                EntityKind::Dispatch
            }
            WriteIntent::CreatePod(_) | WriteIntent::UpdatePod { .. } => EntityKind::Pod,
            WriteIntent::UpdateOrder { .. } | WriteIntent::DeleteOrder { .. } => EntityKind::Order,
            WriteIntent::UpdateVehicle { .. } => EntityKind::Vehicle,
            WriteIntent::UpdateDriver { .. } | WriteIntent::DeleteDriver { .. } => {
                EntityKind::Driver
            }
            WriteIntent::UpdateCustomer { .. }
            | WriteIntent::DeleteCustomer { .. } => EntityKind::Customer,
        }
    }
}

// ============================================================================
// Order
// ============================================================================

/// Records and inputs an order transition may need
#[derive(Debug, Default)]
pub struct OrderTransitionContext<'a> {
    /// Required for any move into IN_TRANSIT
    pub vehicle: Option<&'a Vehicle>,
    /// Falls back to the vehicle's assigned driver
    pub driver_id: Option<EntityId>,
    /// The order's shipments, any status
    pub shipments: &'a [Shipment],
    pub actor: Option<String>,
}

/// Plan `order.status -> to`.
///
/// Moving into IN_TRANSIT yields exactly three intents, in order: create
/// shipment, occupy vehicle, update order. DELIVERED and RETURNED close the
/// order's direct shipments and free their vehicles before the order
/// update. A no-op transition yields none.
///
/// An order with an open dispatch shipment is driven by that dispatch and
/// rejects manual changes.
pub fn plan_order_transition(
    order: &Order,
    to: OrderStatus,
    ctx: &OrderTransitionContext<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    let Transition::Apply { from, to } = check_transition(order.status, to)? else {
        return Ok(Vec::new());
    };
    if let Some(dispatch_id) = open_dispatch(ctx.shipments) {
        return Err(LifecycleError::OrderInDispatch {
            order_id: order.id,
            dispatch_id,
        });
    }

    let mut intents = Vec::with_capacity(3);
    let mut patch = OrderPatch {
        status: Some(to),
        updated_by: ctx.actor.clone(),
        ..Default::default()
    };

    match to {
        OrderStatus::InTransit => {
            let vehicle = ctx.vehicle.ok_or(LifecycleError::VehicleRequired)?;
            if !vehicle.is_assignable() {
                return Err(LifecycleError::VehicleUnavailable(vehicle.id));
            }
            let driver_id = ctx.driver_id.or(vehicle.driver_id);

            intents.push(WriteIntent::CreateShipment(Shipment::scheduled(
                order.id,
                None,
                vehicle.id,
                driver_id,
                1,
                now,
                Duration::hours(DEFAULT_TRANSIT_HOURS),
                now,
            )));
            intents.push(occupy_vehicle(vehicle.id, driver_id));
            patch.pickup_time = Some(now);
        }
        OrderStatus::Delivered => {
            intents.extend(close_direct_shipments(ctx.shipments, ShipmentStatus::Completed));
            patch.delivery_time = Some(now);
        }
        OrderStatus::Returned => {
            intents.extend(close_direct_shipments(ctx.shipments, ShipmentStatus::Cancelled));
        }
        _ => {}
    }

    intents.push(WriteIntent::UpdateOrder {
        id: order.id,
        expected: Some(from),
        patch,
    });
    Ok(intents)
}

/// Dispatch owning one of `shipments` that is still open
pub(crate) fn open_dispatch(shipments: &[Shipment]) -> Option<EntityId> {
    shipments
        .iter()
        .filter(|s| s.status.is_open())
        .find_map(|s| s.dispatch_id)
}

/// Close the open shipments no dispatch owns and free their vehicles
pub(crate) fn close_direct_shipments(shipments: &[Shipment], to: ShipmentStatus) -> Vec<WriteIntent> {
    shipments
        .iter()
        .filter(|s| s.dispatch_id.is_none() && s.status.is_open())
        .flat_map(|s| [shipment_to(s, to), release_vehicle(s.vehicle_id)])
        .collect()
}

/// Orders can only be deleted while PENDING
pub fn plan_order_delete(order: &Order) -> Result<Vec<WriteIntent>, LifecycleError> {
    if order.status != OrderStatus::Pending {
        return Err(LifecycleError::IllegalDelete {
            kind: EntityKind::Order,
            id: order.id,
            status: order.status.to_string(),
        });
    }
    Ok(vec![WriteIntent::DeleteOrder {
        id: order.id,
        expected: OrderStatus::Pending,
    }])
}

// ============================================================================
// Vehicle / Driver
// ============================================================================

fn occupy_vehicle(vehicle_id: EntityId, driver_id: Option<EntityId>) -> WriteIntent {
    WriteIntent::UpdateVehicle {
        id: vehicle_id,
        expected: Some(VehicleStatus::Available),
        patch: VehiclePatch {
            status: Some(VehicleStatus::InTransit),
            driver_id: driver_id.map(Some),
            ..Default::default()
        },
    }
}

fn release_vehicle(vehicle_id: EntityId) -> WriteIntent {
    WriteIntent::UpdateVehicle {
        id: vehicle_id,
        expected: None,
        patch: VehiclePatch {
            status: Some(VehicleStatus::Available),
            driver_id: Some(None),
            ..Default::default()
        },
    }
}

fn set_driver(driver_id: EntityId, expected: Option<DriverStatus>, to: DriverStatus) -> WriteIntent {
    WriteIntent::UpdateDriver {
        id: driver_id,
        expected,
        patch: DriverPatch {
            status: Some(to),
            ..Default::default()
        },
    }
}

/// Vehicles are never hard-deleted: they go INACTIVE
pub fn plan_vehicle_retire(vehicle: &Vehicle) -> Vec<WriteIntent> {
    vec![WriteIntent::UpdateVehicle {
        id: vehicle.id,
        expected: None,
        patch: VehiclePatch {
            status: Some(VehicleStatus::Inactive),
            is_active: Some(false),
            ..Default::default()
        },
    }]
}

/// Manual vehicle edit.
///
/// Only AVAILABLE and MAINTENANCE can be set by hand; IN_TRANSIT follows
/// shipments and INACTIVE follows retirement. Status and driver stay put
/// while the vehicle carries an open shipment.
pub fn plan_vehicle_update(
    vehicle: &Vehicle,
    patch: VehiclePatch,
    open_shipments: u64,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    if let Some(to) = patch.status.filter(|to| *to != vehicle.status) {
        if matches!(to, VehicleStatus::InTransit | VehicleStatus::Inactive) {
            return Err(LifecycleError::Validation(format!(
                "vehicle status {to} cannot be set directly"
            )));
        }
        if !vehicle.is_active {
            return Err(LifecycleError::InvalidTransition {
                kind: EntityKind::Vehicle,
                from: vehicle.status.to_string(),
                to: to.to_string(),
            });
        }
    }
    let moves_status = patch.status.is_some_and(|to| to != vehicle.status);
    let moves_driver = patch.driver_id.is_some_and(|d| d != vehicle.driver_id);
    if (moves_status || moves_driver) && open_shipments > 0 {
        return Err(LifecycleError::ActiveAssignmentExists {
            kind: EntityKind::Vehicle,
            id: vehicle.id,
        });
    }
    if patch == VehiclePatch::default() {
        return Ok(Vec::new());
    }
    Ok(vec![WriteIntent::UpdateVehicle {
        id: vehicle.id,
        expected: Some(vehicle.status),
        patch: VehiclePatch {
            is_active: None,
            ..patch
        },
    }])
}

/// Manual driver edit. ON_DUTY belongs to dispatches: it cannot be set
/// here, and an ON_DUTY driver keeps that status until the dispatch ends.
pub fn plan_driver_update(
    driver: &Driver,
    patch: DriverPatch,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    if let Some(to) = patch.status.filter(|to| *to != driver.status) {
        if to == DriverStatus::OnDuty {
            return Err(LifecycleError::Validation(
                "driver status ON_DUTY is set by dispatches".to_string(),
            ));
        }
        if driver.status == DriverStatus::OnDuty {
            return Err(LifecycleError::ActiveAssignmentExists {
                kind: EntityKind::Driver,
                id: driver.id,
            });
        }
    }
    if patch == DriverPatch::default() {
        return Ok(Vec::new());
    }
    Ok(vec![WriteIntent::UpdateDriver {
        id: driver.id,
        expected: Some(driver.status),
        patch,
    }])
}

/// A driver who is ON_DUTY or holds any open shipment cannot be deleted.
/// The delete is guarded on the status it was planned against.
pub fn plan_driver_delete(
    driver: &Driver,
    open_shipments: u64,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    if driver.status == DriverStatus::OnDuty || open_shipments > 0 {
        return Err(LifecycleError::ActiveAssignmentExists {
            kind: EntityKind::Driver,
            id: driver.id,
        });
    }
    Ok(vec![WriteIntent::DeleteDriver {
        id: driver.id,
        expected: driver.status,
    }])
}

// ============================================================================
// Customer
// ============================================================================

/// Companies need a company name, individuals a first and last name
pub fn validate_customer_names(customer: &Customer) -> Result<(), LifecycleError> {
    let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    let missing = match customer.customer_type {
        CustomerType::Company if !filled(&customer.company_name) => Some("company_name"),
        CustomerType::Individual if !filled(&customer.first_name) => Some("first_name"),
        CustomerType::Individual if !filled(&customer.last_name) => Some("last_name"),
        _ => None,
    };
    match missing {
        Some(field) => Err(LifecycleError::Validation(format!(
            "{field} is required for {} customers",
            customer.customer_type
        ))),
        None => Ok(()),
    }
}

/// Only ACTIVE customers can place orders
pub fn ensure_can_order(customer: &Customer) -> Result<(), LifecycleError> {
    if customer.status == CustomerStatus::Active {
        Ok(())
    } else {
        Err(LifecycleError::CustomerNotActive {
            customer_id: customer.id,
            status: customer.status,
        })
    }
}

/// Status change; a non-blank reason is appended to the notes as a
/// timestamped line.
pub fn plan_customer_status(
    customer: &Customer,
    to: CustomerStatus,
    reason: Option<&str>,
    actor: Option<String>,
    now: DateTime<Utc>,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    let (from, to) = match check_transition(customer.status, to)? {
        Transition::Unchanged(_) => return Ok(Vec::new()),
        Transition::Apply { from, to } => (from, to),
    };
    let notes = reason.map(str::trim).filter(|r| !r.is_empty()).map(|r| {
        let line = format!("[{}] status changed to {to}: {r}", now.to_rfc3339());
        match customer.notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line,
        }
    });
    Ok(vec![WriteIntent::UpdateCustomer {
        id: customer.id,
        expected: Some(from),
        patch: CustomerPatch {
            status: Some(to),
            notes,
            updated_by: actor,
            ..Default::default()
        },
    }])
}

/// Profile edit. Status moves through [`plan_customer_status`] only, and
/// the edited record must still carry the names its type needs.
pub fn plan_customer_update(
    customer: &Customer,
    patch: CustomerPatch,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    if patch.status.is_some() {
        return Err(LifecycleError::Validation(
            "customer status is changed through the status operation".to_string(),
        ));
    }
    let content = CustomerPatch {
        updated_by: None,
        ..patch.clone()
    };
    if content == CustomerPatch::default() {
        return Ok(Vec::new());
    }
    let mut edited = customer.clone();
    patch.apply_to(&mut edited, customer.updated_at);
    validate_customer_names(&edited)?;
    Ok(vec![WriteIntent::UpdateCustomer {
        id: customer.id,
        expected: Some(customer.status),
        patch,
    }])
}

/// Customers with order history stay on file
pub fn plan_customer_delete(
    customer: &Customer,
    orders: u64,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    if orders > 0 {
        return Err(LifecycleError::CustomerHasOrders {
            customer_id: customer.id,
            orders,
        });
    }
    Ok(vec![WriteIntent::DeleteCustomer {
        id: customer.id,
        expected: customer.status,
    }])
}

// ============================================================================
// Dispatch
// ============================================================================

fn transit_window(estimated_hours: Option<Decimal>) -> Duration {
    estimated_hours
        .filter(|h| *h > Decimal::ZERO)
        .and_then(|h| (h * Decimal::from(60)).round().to_i64())
        .map(Duration::minutes)
        .unwrap_or_else(|| Duration::hours(DEFAULT_TRANSIT_HOURS))
}

/// Plan a new dispatch: one shipment per order, vehicle and driver reserved.
///
/// Orders stay CONFIRMED until the dispatch departs. `existing` holds the
/// shipments the orders already have; an order with an open one is taken.
pub fn plan_dispatch_create(
    draft: &NewDispatch,
    orders: &[Order],
    existing: &[Shipment],
    vehicle: &Vehicle,
    driver: &Driver,
    now: DateTime<Utc>,
) -> Result<(Dispatch, Vec<WriteIntent>), LifecycleError> {
    if orders.is_empty() {
        return Err(LifecycleError::Validation(
            "a dispatch needs at least one order".to_string(),
        ));
    }
    if let Some(order) = orders.iter().find(|o| o.status != OrderStatus::Confirmed) {
        return Err(LifecycleError::OrderNotDispatchable {
            order_id: order.id,
            status: order.status,
        });
    }
    if let Some(taken) = existing
        .iter()
        .find(|s| s.status.is_open() && orders.iter().any(|o| o.id == s.order_id))
    {
        return match taken.dispatch_id {
            Some(dispatch_id) => Err(LifecycleError::OrderInDispatch {
                order_id: taken.order_id,
                dispatch_id,
            }),
            None => Err(LifecycleError::OrderNotDispatchable {
                order_id: taken.order_id,
                status: OrderStatus::InTransit,
            }),
        };
    }
    if !vehicle.is_assignable() {
        return Err(LifecycleError::VehicleUnavailable(vehicle.id));
    }
    if driver.status != DriverStatus::Available {
        return Err(LifecycleError::DriverUnavailable(driver.id));
    }

    let total_weight: Decimal = orders.iter().map(|o| o.cargo.weight).sum();
    let total_volume: Decimal = orders.iter().map(|o| o.cargo.volume).sum();
    if total_weight > vehicle.max_load {
        return Err(LifecycleError::CapacityExceeded(format!(
            "weight {} kg > max load {} kg",
            total_weight, vehicle.max_load
        )));
    }
    if total_volume > vehicle.max_volume {
        return Err(LifecycleError::CapacityExceeded(format!(
            "volume {} m3 > max volume {} m3",
            total_volume, vehicle.max_volume
        )));
    }

    let dispatch = Dispatch::scheduled(draft, now);
    let window = transit_window(draft.estimated_duration);

    let mut intents = Vec::with_capacity(orders.len() + 3);
    intents.push(WriteIntent::CreateDispatch(dispatch.clone()));
    for (idx, order) in orders.iter().enumerate() {
        intents.push(WriteIntent::CreateShipment(Shipment::scheduled(
            order.id,
            Some(dispatch.id),
            vehicle.id,
            Some(driver.id),
            idx as i32 + 1,
            dispatch.planned_departure,
            window,
            now,
        )));
    }
    intents.push(occupy_vehicle(vehicle.id, Some(driver.id)));
    intents.push(set_driver(
        driver.id,
        Some(DriverStatus::Available),
        DriverStatus::OnDuty,
    ));
    Ok((dispatch, intents))
}

/// A shipment of the dispatch together with its order
#[derive(Debug, Clone)]
pub struct DispatchLeg {
    pub shipment: Shipment,
    pub order: Order,
}

#[derive(Debug, Default)]
pub struct DispatchTransitionContext<'a> {
    pub legs: &'a [DispatchLeg],
    /// Required when cancelling
    pub reason: Option<String>,
    pub actual_distance: Option<Decimal>,
    pub actual_duration: Option<Decimal>,
    pub actor: Option<String>,
}

/// Plan `dispatch.status -> to` together with the shipment, order, vehicle
/// and driver updates it implies.
pub fn plan_dispatch_transition(
    dispatch: &Dispatch,
    to: DispatchStatus,
    ctx: &DispatchTransitionContext<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    let Transition::Apply { from, to } = check_transition(dispatch.status, to)? else {
        return Ok(Vec::new());
    };

    let mut patch = DispatchPatch {
        status: Some(to),
        ..Default::default()
    };
    let mut dependents = Vec::new();

    if from == DispatchStatus::Scheduled && to.has_departed() {
        patch.departed_at = Some(now);
        for leg in ctx.legs {
            if leg.shipment.status == ShipmentStatus::Scheduled {
                dependents.push(shipment_to(&leg.shipment, ShipmentStatus::InTransit));
                dependents.extend(order_to(&leg.order, OrderStatus::InTransit, ctx, now)?);
            }
        }
    }

    match to {
        DispatchStatus::Arrived => {
            patch.arrived_at = Some(now);
            patch.actual_distance = ctx.actual_distance;
            patch.actual_duration = ctx.actual_duration;
        }
        DispatchStatus::Completed => {
            patch.completed_at = Some(now);
            patch.actual_distance = ctx.actual_distance;
            patch.actual_duration = ctx.actual_duration;
            for leg in ctx.legs {
                if leg.shipment.status.is_open() {
                    dependents.push(shipment_to(&leg.shipment, ShipmentStatus::Completed));
                }
                if leg.order.status == OrderStatus::InTransit {
                    dependents.extend(order_to(&leg.order, OrderStatus::Delivered, ctx, now)?);
                }
            }
            dependents.push(release_vehicle(dispatch.vehicle_id));
            dependents.push(set_driver(dispatch.driver_id, None, DriverStatus::Available));
        }
        DispatchStatus::Cancelled => {
            let reason = ctx
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or(LifecycleError::ReasonRequired)?;
            patch.cancelled_at = Some(now);
            patch.cancel_reason = Some(reason.to_string());
            for leg in ctx.legs {
                if leg.shipment.status.is_open() {
                    dependents.push(shipment_to(&leg.shipment, ShipmentStatus::Cancelled));
                }
                if leg.order.status == OrderStatus::InTransit {
                    dependents.extend(order_to(&leg.order, OrderStatus::Returned, ctx, now)?);
                }
            }
            dependents.push(release_vehicle(dispatch.vehicle_id));
            dependents.push(set_driver(dispatch.driver_id, None, DriverStatus::Available));
        }
        _ => {}
    }

    let mut intents = Vec::with_capacity(dependents.len() + 1);
    intents.push(WriteIntent::UpdateDispatch {
        id: dispatch.id,
        expected: Some(from),
        patch,
    });
    intents.extend(dependents);
    Ok(intents)
}

fn shipment_to(shipment: &Shipment, to: ShipmentStatus) -> WriteIntent {
    WriteIntent::UpdateShipment {
        id: shipment.id,
        expected: Some(shipment.status),
        patch: ShipmentPatch { status: Some(to) },
    }
}

/// Order step driven by a dispatch. Vehicle bookkeeping belongs to the
/// dispatch, so this never creates shipments.
fn order_to(
    order: &Order,
    to: OrderStatus,
    ctx: &DispatchTransitionContext<'_>,
    now: DateTime<Utc>,
) -> Result<Option<WriteIntent>, LifecycleError> {
    let Transition::Apply { from, to } = check_transition(order.status, to)? else {
        return Ok(None);
    };
    let mut patch = OrderPatch {
        status: Some(to),
        updated_by: ctx.actor.clone(),
        ..Default::default()
    };
    match to {
        OrderStatus::InTransit => patch.pickup_time = Some(now),
        OrderStatus::Delivered => patch.delivery_time = Some(now),
        _ => {}
    }
    Ok(Some(WriteIntent::UpdateOrder {
        id: order.id,
        expected: Some(from),
        patch,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{self, dec};

    fn confirmed_with_vehicle() -> (Order, Vehicle) {
        (
            fixtures::order(OrderStatus::Confirmed),
            fixtures::vehicle(VehicleStatus::Available),
        )
    }

    #[test]
    fn test_start_transit_produces_exact_intents() {
        let (order, vehicle) = confirmed_with_vehicle();
        let driver_id = EntityId::new();
        let now = Utc::now();
        let ctx = OrderTransitionContext {
            vehicle: Some(&vehicle),
            driver_id: Some(driver_id),
            actor: Some("dispatcher-7".into()),
            ..Default::default()
        };

        let intents = plan_order_transition(&order, OrderStatus::InTransit, &ctx, now).unwrap();
        assert_eq!(intents.len(), 3);

        match &intents[0] {
            WriteIntent::CreateShipment(s) => {
                assert_eq!(s.order_id, order.id);
                assert_eq!(s.vehicle_id, vehicle.id);
                assert_eq!(s.driver_id, Some(driver_id));
                assert_eq!(s.status, ShipmentStatus::Scheduled);
                assert_eq!(s.estimated_departure, now);
                assert_eq!(s.estimated_arrival, now + Duration::hours(24));
            }
            other => panic!("expected shipment, got {other:?}"),
        }
        assert_eq!(
            intents[1],
            WriteIntent::UpdateVehicle {
                id: vehicle.id,
                expected: Some(VehicleStatus::Available),
                patch: VehiclePatch {
                    status: Some(VehicleStatus::InTransit),
                    driver_id: Some(Some(driver_id)),
                    ..Default::default()
                },
            }
        );
        match &intents[2] {
            WriteIntent::UpdateOrder { id, expected, patch } => {
                assert_eq!(*id, order.id);
                assert_eq!(*expected, Some(OrderStatus::Confirmed));
                assert_eq!(patch.status, Some(OrderStatus::InTransit));
                assert_eq!(patch.pickup_time, Some(now));
                assert_eq!(patch.updated_by.as_deref(), Some("dispatcher-7"));
            }
            other => panic!("expected order update, got {other:?}"),
        }
    }

    #[test]
    fn test_start_transit_falls_back_to_vehicle_driver() {
        let (order, mut vehicle) = confirmed_with_vehicle();
        let assigned = EntityId::new();
        vehicle.driver_id = Some(assigned);
        let ctx = OrderTransitionContext {
            vehicle: Some(&vehicle),
            ..Default::default()
        };
        let intents =
            plan_order_transition(&order, OrderStatus::InTransit, &ctx, Utc::now()).unwrap();
        match &intents[0] {
            WriteIntent::CreateShipment(s) => assert_eq!(s.driver_id, Some(assigned)),
            other => panic!("expected shipment, got {other:?}"),
        }
    }

    #[test]
    fn test_start_transit_requires_vehicle() {
        let order = fixtures::order(OrderStatus::Confirmed);
        let err = plan_order_transition(
            &order,
            OrderStatus::InTransit,
            &OrderTransitionContext::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::VehicleRequired));
    }

    #[test]
    fn test_start_transit_rejects_busy_or_inactive_vehicle() {
        let order = fixtures::order(OrderStatus::Confirmed);
        for vehicle in [
            fixtures::vehicle(VehicleStatus::InTransit),
            fixtures::vehicle(VehicleStatus::Maintenance),
            {
                let mut v = fixtures::vehicle(VehicleStatus::Available);
                v.is_active = false;
                v
            },
        ] {
            let ctx = OrderTransitionContext {
                vehicle: Some(&vehicle),
                ..Default::default()
            };
            let err =
                plan_order_transition(&order, OrderStatus::InTransit, &ctx, Utc::now()).unwrap_err();
            assert!(matches!(err, LifecycleError::VehicleUnavailable(id) if id == vehicle.id));
        }
    }

    #[test]
    fn test_same_status_plans_nothing() {
        let order = fixtures::order(OrderStatus::Delivered);
        let intents = plan_order_transition(
            &order,
            OrderStatus::Delivered,
            &OrderTransitionContext::default(),
            Utc::now(),
        )
        .unwrap();
        assert!(intents.is_empty());
    }

    #[test]
    fn test_illegal_order_transition_plans_nothing() {
        let order = fixtures::order(OrderStatus::Pending);
        let err = plan_order_transition(
            &order,
            OrderStatus::Delivered,
            &OrderTransitionContext::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn test_delivery_stamps_delivery_time() {
        let order = fixtures::order(OrderStatus::InTransit);
        let now = Utc::now();
        let intents = plan_order_transition(
            &order,
            OrderStatus::Delivered,
            &OrderTransitionContext::default(),
            now,
        )
        .unwrap();
        assert_eq!(intents.len(), 1);
        match &intents[0] {
            WriteIntent::UpdateOrder { patch, .. } => {
                assert_eq!(patch.delivery_time, Some(now));
                assert_eq!(patch.pickup_time, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_order_delete_only_when_pending() {
        let pending = fixtures::order(OrderStatus::Pending);
        assert_eq!(plan_order_delete(&pending).unwrap().len(), 1);

        let confirmed = fixtures::order(OrderStatus::Confirmed);
        assert!(matches!(
            plan_order_delete(&confirmed),
            Err(LifecycleError::IllegalDelete { .. })
        ));
    }

    #[test]
    fn test_driver_delete_blocked_by_active_shipment() {
        let driver = fixtures::driver(DriverStatus::Available);
        assert!(matches!(
            plan_driver_delete(&driver, 1),
            Err(LifecycleError::ActiveAssignmentExists { kind: EntityKind::Driver, id }) if id == driver.id
        ));
        assert_eq!(
            plan_driver_delete(&driver, 0).unwrap(),
            vec![WriteIntent::DeleteDriver {
                id: driver.id,
                expected: DriverStatus::Available,
            }]
        );
    }

    #[test]
    fn test_on_duty_driver_cannot_be_deleted() {
        let driver = fixtures::driver(DriverStatus::OnDuty);
        assert!(matches!(
            plan_driver_delete(&driver, 0),
            Err(LifecycleError::ActiveAssignmentExists { kind: EntityKind::Driver, .. })
        ));

        let off_duty = fixtures::driver(DriverStatus::OffDuty);
        assert_eq!(
            plan_driver_delete(&off_duty, 0).unwrap(),
            vec![WriteIntent::DeleteDriver {
                id: off_duty.id,
                expected: DriverStatus::OffDuty,
            }]
        );
    }

    fn direct_shipment(order: &Order, vehicle: &Vehicle, status: ShipmentStatus) -> Shipment {
        let now = Utc::now();
        let mut shipment = Shipment::scheduled(
            order.id,
            None,
            vehicle.id,
            None,
            1,
            now,
            Duration::hours(DEFAULT_TRANSIT_HOURS),
            now,
        );
        shipment.status = status;
        shipment
    }

    #[test]
    fn test_delivery_closes_direct_shipment_and_frees_vehicle() {
        let order = fixtures::order(OrderStatus::InTransit);
        let vehicle = fixtures::vehicle(VehicleStatus::InTransit);
        let shipments = vec![direct_shipment(&order, &vehicle, ShipmentStatus::Scheduled)];
        let ctx = OrderTransitionContext {
            shipments: &shipments,
            ..Default::default()
        };

        let intents = plan_order_transition(&order, OrderStatus::Delivered, &ctx, Utc::now()).unwrap();
        assert_eq!(intents.len(), 3);
        assert_eq!(
            intents[0],
            WriteIntent::UpdateShipment {
                id: shipments[0].id,
                expected: Some(ShipmentStatus::Scheduled),
                patch: ShipmentPatch { status: Some(ShipmentStatus::Completed) },
            }
        );
        assert!(matches!(
            &intents[1],
            WriteIntent::UpdateVehicle { id, patch, .. }
                if *id == vehicle.id
                    && patch.status == Some(VehicleStatus::Available)
                    && patch.driver_id == Some(None)
        ));
        assert!(matches!(
            &intents[2],
            WriteIntent::UpdateOrder { patch, .. } if patch.status == Some(OrderStatus::Delivered)
        ));
    }

    #[test]
    fn test_return_cancels_direct_shipment_and_frees_vehicle() {
        let order = fixtures::order(OrderStatus::InTransit);
        let vehicle = fixtures::vehicle(VehicleStatus::InTransit);
        let shipments = vec![
            direct_shipment(&order, &vehicle, ShipmentStatus::Cancelled),
            direct_shipment(&order, &vehicle, ShipmentStatus::InTransit),
        ];
        let ctx = OrderTransitionContext {
            shipments: &shipments,
            ..Default::default()
        };

        let intents = plan_order_transition(&order, OrderStatus::Returned, &ctx, Utc::now()).unwrap();
        assert_eq!(intents.len(), 3);
        assert!(matches!(
            &intents[0],
            WriteIntent::UpdateShipment { id, patch: ShipmentPatch { status: Some(ShipmentStatus::Cancelled) }, .. }
                if *id == shipments[1].id
        ));
        assert!(matches!(&intents[1], WriteIntent::UpdateVehicle { id, .. } if *id == vehicle.id));
    }

    #[test]
    fn test_returned_order_restarts_with_new_shipment() {
        let order = fixtures::order(OrderStatus::Returned);
        let vehicle = fixtures::vehicle(VehicleStatus::Available);
        let ctx = OrderTransitionContext {
            vehicle: Some(&vehicle),
            ..Default::default()
        };
        let intents = plan_order_transition(&order, OrderStatus::InTransit, &ctx, Utc::now()).unwrap();
        assert_eq!(intents.len(), 3);
        assert!(matches!(&intents[0], WriteIntent::CreateShipment(s) if s.vehicle_id == vehicle.id));

        let err = plan_order_transition(
            &order,
            OrderStatus::InTransit,
            &OrderTransitionContext::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::VehicleRequired));
    }

    #[test]
    fn test_dispatched_order_rejects_manual_changes() {
        let (dispatch, legs) = dispatch_with_leg(
            DispatchStatus::Scheduled,
            ShipmentStatus::Scheduled,
            OrderStatus::Confirmed,
        );
        let shipments = vec![legs[0].shipment.clone()];
        let ctx = OrderTransitionContext {
            shipments: &shipments,
            ..Default::default()
        };
        let err = plan_order_transition(&legs[0].order, OrderStatus::Cancelled, &ctx, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::OrderInDispatch { order_id, dispatch_id }
                if order_id == legs[0].order.id && dispatch_id == dispatch.id
        ));

        // Closed dispatch shipments no longer hold the order
        let mut closed = shipments.clone();
        closed[0].status = ShipmentStatus::Cancelled;
        let ctx = OrderTransitionContext {
            shipments: &closed,
            ..Default::default()
        };
        assert!(plan_order_transition(&legs[0].order, OrderStatus::Cancelled, &ctx, Utc::now()).is_ok());
    }

    #[test]
    fn test_vehicle_update_rules() {
        let vehicle = fixtures::vehicle(VehicleStatus::Available);
        let to_maintenance = VehiclePatch {
            status: Some(VehicleStatus::Maintenance),
            ..Default::default()
        };
        assert_eq!(
            plan_vehicle_update(&vehicle, to_maintenance.clone(), 0).unwrap(),
            vec![WriteIntent::UpdateVehicle {
                id: vehicle.id,
                expected: Some(VehicleStatus::Available),
                patch: to_maintenance.clone(),
            }]
        );

        for forbidden in [VehicleStatus::InTransit, VehicleStatus::Inactive] {
            let patch = VehiclePatch {
                status: Some(forbidden),
                ..Default::default()
            };
            assert!(matches!(
                plan_vehicle_update(&vehicle, patch, 0),
                Err(LifecycleError::Validation(_))
            ));
        }

        let busy = fixtures::vehicle(VehicleStatus::InTransit);
        let release = VehiclePatch {
            status: Some(VehicleStatus::Available),
            ..Default::default()
        };
        assert!(matches!(
            plan_vehicle_update(&busy, release.clone(), 1),
            Err(LifecycleError::ActiveAssignmentExists { kind: EntityKind::Vehicle, .. })
        ));
        // A vehicle left IN_TRANSIT with nothing on board can be freed by hand
        assert_eq!(plan_vehicle_update(&busy, release, 0).unwrap().len(), 1);

        // Capacity edits are fine while loaded
        let bigger = VehiclePatch {
            max_load: Some(dec("12000")),
            ..Default::default()
        };
        assert_eq!(plan_vehicle_update(&busy, bigger, 1).unwrap().len(), 1);

        let mut retired = fixtures::vehicle(VehicleStatus::Inactive);
        retired.is_active = false;
        assert!(matches!(
            plan_vehicle_update(&retired, to_maintenance, 0),
            Err(LifecycleError::InvalidTransition { kind: EntityKind::Vehicle, .. })
        ));
        assert!(plan_vehicle_update(&vehicle, VehiclePatch::default(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_customer_status_appends_reason() {
        let mut customer = fixtures::customer(CustomerType::Company);
        customer.notes = Some("key account".into());
        let now = Utc::now();

        let intents = plan_customer_status(
            &customer,
            CustomerStatus::Suspended,
            Some("  overdue invoices "),
            Some("ops".into()),
            now,
        )
        .unwrap();
        match &intents[..] {
            [WriteIntent::UpdateCustomer { expected, patch, .. }] => {
                assert_eq!(*expected, Some(CustomerStatus::Active));
                assert_eq!(patch.status, Some(CustomerStatus::Suspended));
                let notes = patch.notes.as_deref().unwrap();
                assert!(notes.starts_with("key account\n["));
                assert!(notes.ends_with("status changed to SUSPENDED: overdue invoices"));
                assert_eq!(patch.updated_by.as_deref(), Some("ops"));
            }
            other => panic!("unexpected intents: {other:?}"),
        }

        let quiet = plan_customer_status(&customer, CustomerStatus::Inactive, Some(" "), None, now)
            .unwrap();
        assert!(matches!(
            &quiet[..],
            [WriteIntent::UpdateCustomer { patch: CustomerPatch { notes: None, .. }, .. }]
        ));

        assert!(plan_customer_status(&customer, CustomerStatus::Active, None, None, now)
            .unwrap()
            .is_empty());

        customer.status = CustomerStatus::Inactive;
        assert!(matches!(
            plan_customer_status(&customer, CustomerStatus::Blacklisted, None, None, now),
            Err(LifecycleError::InvalidTransition { kind: EntityKind::Customer, .. })
        ));
    }

    #[test]
    fn test_customer_update_keeps_required_names() {
        let person = fixtures::customer(CustomerType::Individual);
        let blank_last = CustomerPatch {
            last_name: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            plan_customer_update(&person, blank_last),
            Err(LifecycleError::Validation(msg)) if msg.contains("last_name")
        ));

        let status = CustomerPatch {
            status: Some(CustomerStatus::Inactive),
            ..Default::default()
        };
        assert!(matches!(
            plan_customer_update(&person, status),
            Err(LifecycleError::Validation(_))
        ));

        let only_actor = CustomerPatch {
            updated_by: Some("ops".into()),
            ..Default::default()
        };
        assert!(plan_customer_update(&person, only_actor).unwrap().is_empty());

        let move_city = CustomerPatch {
            city: Some("Hangzhou".into()),
            ..Default::default()
        };
        assert_eq!(
            plan_customer_update(&person, move_city.clone()).unwrap(),
            vec![WriteIntent::UpdateCustomer {
                id: person.id,
                expected: Some(CustomerStatus::Active),
                patch: move_city,
            }]
        );
    }

    #[test]
    fn test_customer_delete_and_ordering_rules() {
        let mut customer = fixtures::customer(CustomerType::Company);
        assert!(ensure_can_order(&customer).is_ok());
        assert!(matches!(
            plan_customer_delete(&customer, 3),
            Err(LifecycleError::CustomerHasOrders { orders: 3, .. })
        ));
        assert_eq!(
            plan_customer_delete(&customer, 0).unwrap(),
            vec![WriteIntent::DeleteCustomer {
                id: customer.id,
                expected: CustomerStatus::Active,
            }]
        );

        customer.status = CustomerStatus::Blacklisted;
        assert!(matches!(
            ensure_can_order(&customer),
            Err(LifecycleError::CustomerNotActive { status: CustomerStatus::Blacklisted, .. })
        ));

        customer.company_name = None;
        assert!(validate_customer_names(&customer).is_err());
    }

    #[test]
    fn test_driver_update_rules() {
        let driver = fixtures::driver(DriverStatus::Available);
        let off = DriverPatch {
            status: Some(DriverStatus::OffDuty),
            phone: Some("555-0199".into()),
            ..Default::default()
        };
        assert_eq!(
            plan_driver_update(&driver, off.clone()).unwrap(),
            vec![WriteIntent::UpdateDriver {
                id: driver.id,
                expected: Some(DriverStatus::Available),
                patch: off,
            }]
        );

        let on_duty = DriverPatch {
            status: Some(DriverStatus::OnDuty),
            ..Default::default()
        };
        assert!(matches!(
            plan_driver_update(&driver, on_duty),
            Err(LifecycleError::Validation(_))
        ));

        let busy = fixtures::driver(DriverStatus::OnDuty);
        let free = DriverPatch {
            status: Some(DriverStatus::Available),
            ..Default::default()
        };
        assert!(matches!(
            plan_driver_update(&busy, free),
            Err(LifecycleError::ActiveAssignmentExists { kind: EntityKind::Driver, .. })
        ));
        let rename = DriverPatch {
            name: Some("Dana K.".into()),
            ..Default::default()
        };
        assert_eq!(plan_driver_update(&busy, rename).unwrap().len(), 1);
    }

    #[test]
    fn test_vehicle_retire_is_soft() {
        let vehicle = fixtures::vehicle(VehicleStatus::Available);
        match &plan_vehicle_retire(&vehicle)[0] {
            WriteIntent::UpdateVehicle { patch, .. } => {
                assert_eq!(patch.status, Some(VehicleStatus::Inactive));
                assert_eq!(patch.is_active, Some(false));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn dispatch_draft(orders: &[Order], vehicle: &Vehicle, driver: &Driver) -> NewDispatch {
        NewDispatch {
            order_ids: orders.iter().map(|o| o.id).collect(),
            vehicle_id: vehicle.id,
            driver_id: driver.id,
            planned_departure: None,
            estimated_duration: Some(dec("6.5")),
            estimated_distance: Some(dec("420")),
        }
    }

    #[test]
    fn test_dispatch_create_reserves_resources() {
        let orders = vec![
            fixtures::order(OrderStatus::Confirmed),
            fixtures::order(OrderStatus::Confirmed),
        ];
        let vehicle = fixtures::vehicle(VehicleStatus::Available);
        let driver = fixtures::driver(DriverStatus::Available);
        let now = Utc::now();
        let draft = dispatch_draft(&orders, &vehicle, &driver);

        let (dispatch, intents) = plan_dispatch_create(&draft, &orders, &[], &vehicle, &driver, now).unwrap();
        assert_eq!(dispatch.status, DispatchStatus::Scheduled);
        assert!(dispatch.dispatch_number.starts_with("DISP"));
        // dispatch + 2 shipments + vehicle + driver
        assert_eq!(intents.len(), 5);

        let shipments: Vec<&Shipment> = intents
            .iter()
            .filter_map(|i| match i {
                WriteIntent::CreateShipment(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(shipments.len(), 2);
        assert_eq!(shipments[0].sequence, 1);
        assert_eq!(shipments[1].sequence, 2);
        assert_eq!(shipments[1].dispatch_id, Some(dispatch.id));
        assert_eq!(
            shipments[0].estimated_arrival - shipments[0].estimated_departure,
            Duration::minutes(390)
        );
        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateDriver { patch: DriverPatch { status: Some(DriverStatus::OnDuty), .. }, .. }
        )));
        assert!(!intents.iter().any(|i| matches!(i, WriteIntent::UpdateOrder { .. })));
    }

    #[test]
    fn test_dispatch_create_checks() {
        let vehicle = fixtures::vehicle(VehicleStatus::Available);
        let driver = fixtures::driver(DriverStatus::Available);
        let now = Utc::now();

        let pending = vec![fixtures::order(OrderStatus::Pending)];
        let draft = dispatch_draft(&pending, &vehicle, &driver);
        assert!(matches!(
            plan_dispatch_create(&draft, &pending, &[], &vehicle, &driver, now),
            Err(LifecycleError::OrderNotDispatchable { status: OrderStatus::Pending, .. })
        ));

        let orders = vec![fixtures::order(OrderStatus::Confirmed)];
        let busy_driver = fixtures::driver(DriverStatus::OnDuty);
        let draft = dispatch_draft(&orders, &vehicle, &busy_driver);
        assert!(matches!(
            plan_dispatch_create(&draft, &orders, &[], &vehicle, &busy_driver, now),
            Err(LifecycleError::DriverUnavailable(_))
        ));

        let busy_vehicle = fixtures::vehicle(VehicleStatus::Maintenance);
        let draft = dispatch_draft(&orders, &busy_vehicle, &driver);
        assert!(matches!(
            plan_dispatch_create(&draft, &orders, &[], &busy_vehicle, &driver, now),
            Err(LifecycleError::VehicleUnavailable(_))
        ));

        let mut heavy = fixtures::order(OrderStatus::Confirmed);
        heavy.cargo = fixtures::cargo("12000", "5");
        let heavy = vec![heavy];
        let draft = dispatch_draft(&heavy, &vehicle, &driver);
        assert!(matches!(
            plan_dispatch_create(&draft, &heavy, &[], &vehicle, &driver, now),
            Err(LifecycleError::CapacityExceeded(_))
        ));

        let draft = dispatch_draft(&[], &vehicle, &driver);
        assert!(matches!(
            plan_dispatch_create(&draft, &[], &[], &vehicle, &driver, now),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn test_order_cannot_join_two_dispatches() {
        let (first, legs) = dispatch_with_leg(
            DispatchStatus::Scheduled,
            ShipmentStatus::Scheduled,
            OrderStatus::Confirmed,
        );
        let orders = vec![legs[0].order.clone()];
        let existing = vec![legs[0].shipment.clone()];
        let vehicle = fixtures::vehicle(VehicleStatus::Available);
        let driver = fixtures::driver(DriverStatus::Available);
        let draft = dispatch_draft(&orders, &vehicle, &driver);

        let err = plan_dispatch_create(&draft, &orders, &existing, &vehicle, &driver, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::OrderInDispatch { dispatch_id, .. } if dispatch_id == first.id
        ));

        // Once the first dispatch's shipment is cancelled the order is free again
        let mut cancelled = existing;
        cancelled[0].status = ShipmentStatus::Cancelled;
        assert!(
            plan_dispatch_create(&draft, &orders, &cancelled, &vehicle, &driver, Utc::now()).is_ok()
        );
    }

    /// A dispatch planned over one CONFIRMED order, then moved to the given
    /// statuses
    fn dispatch_with_leg(
        status: DispatchStatus,
        shipment_status: ShipmentStatus,
        order_status: OrderStatus,
    ) -> (Dispatch, Vec<DispatchLeg>) {
        let mut orders = vec![fixtures::order(OrderStatus::Confirmed)];
        let vehicle = fixtures::vehicle(VehicleStatus::Available);
        let driver = fixtures::driver(DriverStatus::Available);
        let draft = dispatch_draft(&orders, &vehicle, &driver);
        let (mut dispatch, intents) =
            plan_dispatch_create(&draft, &orders, &[], &vehicle, &driver, Utc::now()).unwrap();
        dispatch.status = status;
        orders[0].status = order_status;
        let mut shipment = intents
            .into_iter()
            .find_map(|i| match i {
                WriteIntent::CreateShipment(s) => Some(s),
                _ => None,
            })
            .unwrap();
        shipment.status = shipment_status;
        let legs = vec![DispatchLeg {
            shipment,
            order: orders.into_iter().next().unwrap(),
        }];
        (dispatch, legs)
    }

    #[test]
    fn test_dispatch_cancel_requires_reason() {
        let (dispatch, legs) = dispatch_with_leg(
            DispatchStatus::Scheduled,
            ShipmentStatus::Scheduled,
            OrderStatus::Confirmed,
        );
        for reason in [None, Some("   ".to_string())] {
            let ctx = DispatchTransitionContext {
                legs: &legs,
                reason,
                ..Default::default()
            };
            let err = plan_dispatch_transition(&dispatch, DispatchStatus::Cancelled, &ctx, Utc::now())
                .unwrap_err();
            assert!(matches!(err, LifecycleError::ReasonRequired));
        }
    }

    #[test]
    fn test_dispatch_departure_moves_orders_and_shipments() {
        let (dispatch, legs) = dispatch_with_leg(
            DispatchStatus::Scheduled,
            ShipmentStatus::Scheduled,
            OrderStatus::Confirmed,
        );
        let now = Utc::now();
        let ctx = DispatchTransitionContext {
            legs: &legs,
            ..Default::default()
        };
        let intents = plan_dispatch_transition(&dispatch, DispatchStatus::Departed, &ctx, now).unwrap();
        assert_eq!(intents.len(), 3);
        match &intents[0] {
            WriteIntent::UpdateDispatch { expected, patch, .. } => {
                assert_eq!(*expected, Some(DispatchStatus::Scheduled));
                assert_eq!(patch.departed_at, Some(now));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateShipment { patch: ShipmentPatch { status: Some(ShipmentStatus::InTransit) }, .. }
        )));
        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateOrder { expected: Some(OrderStatus::Confirmed), patch, .. }
                if patch.status == Some(OrderStatus::InTransit) && patch.pickup_time == Some(now)
        )));
    }

    #[test]
    fn test_dispatch_complete_delivers_and_releases() {
        let (dispatch, legs) = dispatch_with_leg(
            DispatchStatus::Arrived,
            ShipmentStatus::InTransit,
            OrderStatus::InTransit,
        );
        let ctx = DispatchTransitionContext {
            legs: &legs,
            actual_distance: Some(dec("431.2")),
            ..Default::default()
        };
        let intents =
            plan_dispatch_transition(&dispatch, DispatchStatus::Completed, &ctx, Utc::now()).unwrap();

        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateOrder { patch, .. } if patch.status == Some(OrderStatus::Delivered)
        )));
        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateVehicle { id, patch, .. }
                if *id == dispatch.vehicle_id
                    && patch.status == Some(VehicleStatus::Available)
                    && patch.driver_id == Some(None)
        )));
        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateDriver { id, patch: DriverPatch { status: Some(DriverStatus::Available), .. }, .. }
                if *id == dispatch.driver_id
        )));
    }

    #[test]
    fn test_dispatch_cancel_returns_orders_in_transit() {
        let (dispatch, legs) = dispatch_with_leg(
            DispatchStatus::InTransit,
            ShipmentStatus::InTransit,
            OrderStatus::InTransit,
        );
        let ctx = DispatchTransitionContext {
            legs: &legs,
            reason: Some("engine failure".into()),
            ..Default::default()
        };
        let intents =
            plan_dispatch_transition(&dispatch, DispatchStatus::Cancelled, &ctx, Utc::now()).unwrap();
        match &intents[0] {
            WriteIntent::UpdateDispatch { patch, .. } => {
                assert_eq!(patch.cancel_reason.as_deref(), Some("engine failure"));
                assert!(patch.cancelled_at.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateOrder { patch, .. } if patch.status == Some(OrderStatus::Returned)
        )));
        assert!(intents.iter().any(|i| matches!(
            i,
            WriteIntent::UpdateShipment { patch: ShipmentPatch { status: Some(ShipmentStatus::Cancelled) }, .. }
        )));
    }

    #[test]
    fn test_dispatch_cancel_leaves_confirmed_orders() {
        let (dispatch, legs) = dispatch_with_leg(
            DispatchStatus::Scheduled,
            ShipmentStatus::Scheduled,
            OrderStatus::Confirmed,
        );
        let ctx = DispatchTransitionContext {
            legs: &legs,
            reason: Some("customer hold".into()),
            ..Default::default()
        };
        let intents =
            plan_dispatch_transition(&dispatch, DispatchStatus::Cancelled, &ctx, Utc::now()).unwrap();
        assert!(!intents.iter().any(|i| matches!(i, WriteIntent::UpdateOrder { .. })));
    }

    #[test]
    fn test_terminal_dispatch_rejects_changes() {
        let (dispatch, legs) = dispatch_with_leg(
            DispatchStatus::Completed,
            ShipmentStatus::Completed,
            OrderStatus::Delivered,
        );
        let ctx = DispatchTransitionContext {
            legs: &legs,
            reason: Some("late".into()),
            ..Default::default()
        };
        assert!(matches!(
            plan_dispatch_transition(&dispatch, DispatchStatus::Cancelled, &ctx, Utc::now()),
            Err(LifecycleError::InvalidTransition { kind: EntityKind::Dispatch, .. })
        ));
    }
}
