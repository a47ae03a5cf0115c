//! PostgreSQL store
//!
//! `apply` runs every intent inside one transaction. Status-guarded updates
//! use `WHERE status = $expected`; zero affected rows rolls the transaction
//! back and reports a conflict.

use async_trait::async_trait;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{PgConnection, PgPool, Row};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{
    CustomerFilter, CustomerOrderSummary, DispatchFilter, DriverFilter, OrderFilter, StoreError,
    TmsStore, VehicleFilter,
};
use crate::core_types::EntityId;
use crate::lifecycle::{
    CustomerStatus, DispatchStatus, DriverStatus, EntityKind, OrderStatus, PodStatus,
    ShipmentStatus, VehicleStatus, WriteIntent,
};
use crate::models::{
    Cargo, Customer, CustomerType, Dispatch, Driver, Order, PaymentStatus, Pod, Priority,
    Shipment, TrackingPoint, Vehicle, VehicleType,
};

const CUSTOMER_COLUMNS: &str = "id, customer_number, customer_type, company_name, first_name, \
     last_name, email, phone, address, city, province, postal_code, status, credit_rating, \
     credit_limit, notes, created_by, updated_by, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, priority, payment_status, \
     cargo_name, cargo_weight, cargo_volume, origin_address, destination_address, total_amount, \
     pickup_time, delivery_time, expected_time, notes, updated_by, created_at, updated_at";

const VEHICLE_COLUMNS: &str = "id, license_plate, vehicle_type, max_load, max_volume, status, \
     driver_id, is_active, created_at, updated_at";

const DRIVER_COLUMNS: &str =
    "id, name, phone, license_number, status, created_at, updated_at";

const DISPATCH_COLUMNS: &str = "id, dispatch_number, vehicle_id, driver_id, status, \
     planned_departure, estimated_duration, estimated_distance, departed_at, arrived_at, \
     completed_at, cancelled_at, cancel_reason, actual_distance, actual_duration, created_at, \
     updated_at";

const SHIPMENT_COLUMNS: &str = "id, shipment_number, order_id, dispatch_id, vehicle_id, \
     driver_id, status, sequence, estimated_departure, estimated_arrival, created_at, updated_at";

const POD_COLUMNS: &str = "id, pod_number, order_id, status, file_name, original_name, \
     file_path, file_url, file_size, mime_type, checksum, receiver_name, receiver_signature, \
     delivery_photo, delivery_time, notes, uploaded_by, verified_by, verified_at, \
     rejection_reason, created_at, updated_at";

const TRACKING_COLUMNS: &str = "id, shipment_id, latitude, longitude, speed, heading, altitude, \
     battery_level, recorded_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// SCHEDULED or IN_TRANSIT shipments whose `column` equals `id`
    async fn count_open_shipments(&self, column: &str, id: EntityId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM shipments_tb WHERE {column} = $1 AND status IN ($2, $3)"
        ))
        .bind(id.to_string())
        .bind(ShipmentStatus::Scheduled.id())
        .bind(ShipmentStatus::InTransit.id())
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn id_col(row: &PgRow, col: &str) -> Result<EntityId, StoreError> {
    let raw: String = row.try_get(col)?;
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{col} is not a ULID: {raw}")))
}

fn opt_id_col(row: &PgRow, col: &str) -> Result<Option<EntityId>, StoreError> {
    let raw: Option<String> = row.try_get(col)?;
    raw.map(|r| {
        r.parse()
            .map_err(|_| StoreError::Corrupt(format!("{col} is not a ULID: {r}")))
    })
    .transpose()
}

fn code_col<T>(row: &PgRow, col: &str, from_id: fn(i16) -> Option<T>) -> Result<T, StoreError> {
    let raw: i16 = row.try_get(col)?;
    from_id(raw).ok_or_else(|| StoreError::Corrupt(format!("unknown {col} id {raw}")))
}

fn row_to_customer(row: &PgRow) -> Result<Customer, StoreError> {
    Ok(Customer {
        id: id_col(row, "id")?,
        customer_number: row.try_get("customer_number")?,
        customer_type: code_col(row, "customer_type", CustomerType::from_id)?,
        company_name: row.try_get("company_name")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        province: row.try_get("province")?,
        postal_code: row.try_get("postal_code")?,
        status: code_col(row, "status", CustomerStatus::from_id)?,
        credit_rating: row.try_get("credit_rating")?,
        credit_limit: row.try_get("credit_limit")?,
        notes: row.try_get("notes")?,
        created_by: row.try_get("created_by")?,
        updated_by: row.try_get("updated_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order, StoreError> {
    Ok(Order {
        id: id_col(row, "id")?,
        order_number: row.try_get("order_number")?,
        customer_id: id_col(row, "customer_id")?,
        status: code_col(row, "status", OrderStatus::from_id)?,
        priority: code_col(row, "priority", Priority::from_id)?,
        payment_status: code_col(row, "payment_status", PaymentStatus::from_id)?,
        cargo: Cargo {
            name: row.try_get("cargo_name")?,
            weight: row.try_get("cargo_weight")?,
            volume: row.try_get("cargo_volume")?,
        },
        origin_address: row.try_get("origin_address")?,
        destination_address: row.try_get("destination_address")?,
        total_amount: row.try_get("total_amount")?,
        pickup_time: row.try_get("pickup_time")?,
        delivery_time: row.try_get("delivery_time")?,
        expected_time: row.try_get("expected_time")?,
        notes: row.try_get("notes")?,
        updated_by: row.try_get("updated_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_vehicle(row: &PgRow) -> Result<Vehicle, StoreError> {
    Ok(Vehicle {
        id: id_col(row, "id")?,
        license_plate: row.try_get("license_plate")?,
        vehicle_type: code_col(row, "vehicle_type", VehicleType::from_id)?,
        max_load: row.try_get("max_load")?,
        max_volume: row.try_get("max_volume")?,
        status: code_col(row, "status", VehicleStatus::from_id)?,
        driver_id: opt_id_col(row, "driver_id")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_driver(row: &PgRow) -> Result<Driver, StoreError> {
    Ok(Driver {
        id: id_col(row, "id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        license_number: row.try_get("license_number")?,
        status: code_col(row, "status", DriverStatus::from_id)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_dispatch(row: &PgRow) -> Result<Dispatch, StoreError> {
    Ok(Dispatch {
        id: id_col(row, "id")?,
        dispatch_number: row.try_get("dispatch_number")?,
        vehicle_id: id_col(row, "vehicle_id")?,
        driver_id: id_col(row, "driver_id")?,
        status: code_col(row, "status", DispatchStatus::from_id)?,
        planned_departure: row.try_get("planned_departure")?,
        estimated_duration: row.try_get("estimated_duration")?,
        estimated_distance: row.try_get("estimated_distance")?,
        departed_at: row.try_get("departed_at")?,
        arrived_at: row.try_get("arrived_at")?,
        completed_at: row.try_get("completed_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        cancel_reason: row.try_get("cancel_reason")?,
        actual_distance: row.try_get("actual_distance")?,
        actual_duration: row.try_get("actual_duration")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_shipment(row: &PgRow) -> Result<Shipment, StoreError> {
    Ok(Shipment {
        id: id_col(row, "id")?,
        shipment_number: row.try_get("shipment_number")?,
        order_id: id_col(row, "order_id")?,
        dispatch_id: opt_id_col(row, "dispatch_id")?,
        vehicle_id: id_col(row, "vehicle_id")?,
        driver_id: opt_id_col(row, "driver_id")?,
        status: code_col(row, "status", ShipmentStatus::from_id)?,
        sequence: row.try_get("sequence")?,
        estimated_departure: row.try_get("estimated_departure")?,
        estimated_arrival: row.try_get("estimated_arrival")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_pod(row: &PgRow) -> Result<Pod, StoreError> {
    Ok(Pod {
        id: id_col(row, "id")?,
        pod_number: row.try_get("pod_number")?,
        order_id: id_col(row, "order_id")?,
        status: code_col(row, "status", PodStatus::from_id)?,
        file_name: row.try_get("file_name")?,
        original_name: row.try_get("original_name")?,
        file_path: row.try_get("file_path")?,
        file_url: row.try_get("file_url")?,
        file_size: row.try_get("file_size")?,
        mime_type: row.try_get("mime_type")?,
        checksum: row.try_get("checksum")?,
        receiver_name: row.try_get("receiver_name")?,
        receiver_signature: row.try_get("receiver_signature")?,
        delivery_photo: row.try_get("delivery_photo")?,
        delivery_time: row.try_get("delivery_time")?,
        notes: row.try_get("notes")?,
        uploaded_by: row.try_get("uploaded_by")?,
        verified_by: row.try_get("verified_by")?,
        verified_at: row.try_get("verified_at")?,
        rejection_reason: row.try_get("rejection_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_tracking(row: &PgRow) -> Result<TrackingPoint, StoreError> {
    Ok(TrackingPoint {
        id: id_col(row, "id")?,
        shipment_id: id_col(row, "shipment_id")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        speed: row.try_get("speed")?,
        heading: row.try_get("heading")?,
        altitude: row.try_get("altitude")?,
        battery_level: row.try_get("battery_level")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

// ============================================================================
// Writes
// ============================================================================

/// Zero affected rows means the guard failed (status moved) or the row is gone
fn expect_row(
    result: PgQueryResult,
    kind: EntityKind,
    id: EntityId,
    guarded: bool,
) -> Result<(), StoreError> {
    match (result.rows_affected(), guarded) {
        (0, true) => Err(StoreError::Conflict { kind, id }),
        (0, false) => Err(StoreError::NotFound { kind, id }),
        _ => Ok(()),
    }
}

fn unique_violation(e: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what()),
        _ => StoreError::Database(e),
    }
}

async fn insert_order_row(conn: &mut PgConnection, o: &Order) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO orders_tb ({ORDER_COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
    ))
    .bind(o.id.to_string())
    .bind(&o.order_number)
    .bind(o.customer_id.to_string())
    .bind(o.status.id())
    .bind(o.priority.id())
    .bind(o.payment_status.id())
    .bind(&o.cargo.name)
    .bind(o.cargo.weight)
    .bind(o.cargo.volume)
    .bind(&o.origin_address)
    .bind(&o.destination_address)
    .bind(o.total_amount)
    .bind(o.pickup_time)
    .bind(o.delivery_time)
    .bind(o.expected_time)
    .bind(&o.notes)
    .bind(&o.updated_by)
    .bind(o.created_at)
    .bind(o.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| unique_violation(e, || format!("order number {}", o.order_number)))?;
    Ok(())
}

async fn insert_dispatch_row(conn: &mut PgConnection, d: &Dispatch) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO dispatches_tb ({DISPATCH_COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
    ))
    .bind(d.id.to_string())
    .bind(&d.dispatch_number)
    .bind(d.vehicle_id.to_string())
    .bind(d.driver_id.to_string())
    .bind(d.status.id())
    .bind(d.planned_departure)
    .bind(d.estimated_duration)
    .bind(d.estimated_distance)
    .bind(d.departed_at)
    .bind(d.arrived_at)
    .bind(d.completed_at)
    .bind(d.cancelled_at)
    .bind(&d.cancel_reason)
    .bind(d.actual_distance)
    .bind(d.actual_duration)
    .bind(d.created_at)
    .bind(d.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| unique_violation(e, || format!("dispatch number {}", d.dispatch_number)))?;
    Ok(())
}

async fn insert_shipment_row(conn: &mut PgConnection, s: &Shipment) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO shipments_tb ({SHIPMENT_COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
    ))
    .bind(s.id.to_string())
    .bind(&s.shipment_number)
    .bind(s.order_id.to_string())
    .bind(s.dispatch_id.map(|id| id.to_string()))
    .bind(s.vehicle_id.to_string())
    .bind(s.driver_id.map(|id| id.to_string()))
    .bind(s.status.id())
    .bind(s.sequence)
    .bind(s.estimated_departure)
    .bind(s.estimated_arrival)
    .bind(s.created_at)
    .bind(s.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| unique_violation(e, || format!("shipment number {}", s.shipment_number)))?;
    Ok(())
}

async fn insert_pod_row(conn: &mut PgConnection, p: &Pod) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO pods_tb ({POD_COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, \
          $20, $21, $22)"
    ))
    .bind(p.id.to_string())
    .bind(&p.pod_number)
    .bind(p.order_id.to_string())
    .bind(p.status.id())
    .bind(&p.file_name)
    .bind(&p.original_name)
    .bind(&p.file_path)
    .bind(&p.file_url)
    .bind(p.file_size)
    .bind(&p.mime_type)
    .bind(&p.checksum)
    .bind(&p.receiver_name)
    .bind(&p.receiver_signature)
    .bind(&p.delivery_photo)
    .bind(p.delivery_time)
    .bind(&p.notes)
    .bind(&p.uploaded_by)
    .bind(&p.verified_by)
    .bind(p.verified_at)
    .bind(&p.rejection_reason)
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| unique_violation(e, || format!("POD number {}", p.pod_number)))?;
    Ok(())
}

async fn apply_intent(conn: &mut PgConnection, intent: &WriteIntent) -> Result<(), StoreError> {
    match intent {
        WriteIntent::CreateShipment(s) => insert_shipment_row(conn, s).await,
        WriteIntent::CreateDispatch(d) => insert_dispatch_row(conn, d).await,
        WriteIntent::CreatePod(p) => insert_pod_row(conn, p).await,
        WriteIntent::UpdateOrder { id, expected, patch } => {
            let result = sqlx::query(
                r#"
                UPDATE orders_tb SET
                    status = COALESCE($2, status),
                    payment_status = COALESCE($3, payment_status),
                    pickup_time = COALESCE($4, pickup_time),
                    delivery_time = COALESCE($5, delivery_time),
                    updated_by = COALESCE($6, updated_by),
                    updated_at = NOW()
                WHERE id = $1 AND ($7::SMALLINT IS NULL OR status = $7)
                "#,
            )
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.id()))
            .bind(patch.payment_status.map(|s| s.id()))
            .bind(patch.pickup_time)
            .bind(patch.delivery_time)
            .bind(&patch.updated_by)
            .bind(expected.map(|s| s.id()))
            .execute(&mut *conn)
            .await?;
            expect_row(result, EntityKind::Order, *id, expected.is_some())
        }
        WriteIntent::UpdateVehicle { id, expected, patch } => {
            let result = sqlx::query(
                r#"
                UPDATE vehicles_tb SET
                    status = COALESCE($2, status),
                    driver_id = CASE WHEN $3 THEN $4 ELSE driver_id END,
                    is_active = COALESCE($5, is_active),
                    license_plate = COALESCE($7, license_plate),
                    vehicle_type = COALESCE($8, vehicle_type),
                    max_load = COALESCE($9, max_load),
                    max_volume = COALESCE($10, max_volume),
                    updated_at = NOW()
                WHERE id = $1 AND ($6::SMALLINT IS NULL OR status = $6)
                "#,
            )
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.id()))
            .bind(patch.driver_id.is_some())
            .bind(patch.driver_id.flatten().map(|d| d.to_string()))
            .bind(patch.is_active)
            .bind(expected.map(|s| s.id()))
            .bind(&patch.license_plate)
            .bind(patch.vehicle_type.map(|t| t.id()))
            .bind(patch.max_load)
            .bind(patch.max_volume)
            .execute(&mut *conn)
            .await
            .map_err(|e| unique_violation(e, || format!("license plate for vehicle {id}")))?;
            expect_row(result, EntityKind::Vehicle, *id, expected.is_some())
        }
        WriteIntent::UpdateDriver { id, expected, patch } => {
            let result = sqlx::query(
                r#"
                UPDATE drivers_tb SET
                    status = COALESCE($2, status),
                    name = COALESCE($4, name),
                    phone = COALESCE($5, phone),
                    license_number = COALESCE($6, license_number),
                    updated_at = NOW()
                WHERE id = $1 AND ($3::SMALLINT IS NULL OR status = $3)
                "#,
            )
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.id()))
            .bind(expected.map(|s| s.id()))
            .bind(&patch.name)
            .bind(&patch.phone)
            .bind(&patch.license_number)
            .execute(&mut *conn)
            .await?;
            expect_row(result, EntityKind::Driver, *id, expected.is_some())
        }
        WriteIntent::UpdateDispatch { id, expected, patch } => {
            let result = sqlx::query(
                r#"
                UPDATE dispatches_tb SET
                    status = COALESCE($2, status),
                    departed_at = COALESCE($3, departed_at),
                    arrived_at = COALESCE($4, arrived_at),
                    completed_at = COALESCE($5, completed_at),
                    cancelled_at = COALESCE($6, cancelled_at),
                    cancel_reason = COALESCE($7, cancel_reason),
                    actual_distance = COALESCE($8, actual_distance),
                    actual_duration = COALESCE($9, actual_duration),
                    updated_at = NOW()
                WHERE id = $1 AND ($10::SMALLINT IS NULL OR status = $10)
                "#,
            )
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.id()))
            .bind(patch.departed_at)
            .bind(patch.arrived_at)
            .bind(patch.completed_at)
            .bind(patch.cancelled_at)
            .bind(&patch.cancel_reason)
            .bind(patch.actual_distance)
            .bind(patch.actual_duration)
            .bind(expected.map(|s| s.id()))
            .execute(&mut *conn)
            .await?;
            expect_row(result, EntityKind::Dispatch, *id, expected.is_some())
        }
        WriteIntent::UpdateShipment { id, expected, patch } => {
            let result = sqlx::query(
                r#"
                UPDATE shipments_tb SET
                    status = COALESCE($2, status),
                    updated_at = NOW()
                WHERE id = $1 AND ($3::SMALLINT IS NULL OR status = $3)
                "#,
            )
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.id()))
            .bind(expected.map(|s| s.id()))
            .execute(&mut *conn)
            .await?;
            expect_row(result, EntityKind::Shipment, *id, expected.is_some())
        }
        WriteIntent::UpdatePod { id, expected, patch } => {
            let result = sqlx::query(
                r#"
                UPDATE pods_tb SET
                    status = COALESCE($2, status),
                    verified_by = COALESCE($3, verified_by),
                    verified_at = COALESCE($4, verified_at),
                    rejection_reason = COALESCE($5, rejection_reason),
                    updated_at = NOW()
                WHERE id = $1 AND ($6::SMALLINT IS NULL OR status = $6)
                "#,
            )
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.id()))
            .bind(&patch.verified_by)
            .bind(patch.verified_at)
            .bind(&patch.rejection_reason)
            .bind(expected.map(|s| s.id()))
            .execute(&mut *conn)
            .await?;
            expect_row(result, EntityKind::Pod, *id, expected.is_some())
        }
        WriteIntent::UpdateCustomer { id, expected, patch } => {
            let result = sqlx::query(
                r#"
                UPDATE customers_tb SET
                    status = COALESCE($2, status),
                    company_name = COALESCE($3, company_name),
                    first_name = COALESCE($4, first_name),
                    last_name = COALESCE($5, last_name),
                    email = COALESCE($6, email),
                    phone = COALESCE($7, phone),
                    address = COALESCE($8, address),
                    city = COALESCE($9, city),
                    province = COALESCE($10, province),
                    postal_code = COALESCE($11, postal_code),
                    credit_rating = COALESCE($12, credit_rating),
                    credit_limit = COALESCE($13, credit_limit),
                    notes = COALESCE($14, notes),
                    updated_by = COALESCE($15, updated_by),
                    updated_at = NOW()
                WHERE id = $1 AND ($16::SMALLINT IS NULL OR status = $16)
                "#,
            )
            .bind(id.to_string())
            .bind(patch.status.map(|s| s.id()))
            .bind(&patch.company_name)
            .bind(&patch.first_name)
            .bind(&patch.last_name)
            .bind(&patch.email)
            .bind(&patch.phone)
            .bind(&patch.address)
            .bind(&patch.city)
            .bind(&patch.province)
            .bind(&patch.postal_code)
            .bind(patch.credit_rating)
            .bind(patch.credit_limit)
            .bind(&patch.notes)
            .bind(&patch.updated_by)
            .bind(expected.map(|s| s.id()))
            .execute(&mut *conn)
            .await
            .map_err(|e| unique_violation(e, || format!("email for customer {id}")))?;
            expect_row(result, EntityKind::Customer, *id, expected.is_some())
        }
        WriteIntent::DeleteOrder { id, expected } => {
            let result = sqlx::query("DELETE FROM orders_tb WHERE id = $1 AND status = $2")
                .bind(id.to_string())
                .bind(expected.id())
                .execute(&mut *conn)
                .await?;
            expect_row(result, EntityKind::Order, *id, true)
        }
        WriteIntent::DeleteDriver { id, expected } => {
            let result = sqlx::query("DELETE FROM drivers_tb WHERE id = $1 AND status = $2")
                .bind(id.to_string())
                .bind(expected.id())
                .execute(&mut *conn)
                .await?;
            expect_row(result, EntityKind::Driver, *id, true)
        }
        WriteIntent::DeleteCustomer { id, expected } => {
            let result = sqlx::query("DELETE FROM customers_tb WHERE id = $1 AND status = $2")
                .bind(id.to_string())
                .bind(expected.id())
                .execute(&mut *conn)
                .await?;
            expect_row(result, EntityKind::Customer, *id, true)
        }
    }
}

#[async_trait]
impl TmsStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn customer(&self, id: EntityId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers_tb WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_customer).transpose()
    }

    async fn customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers_tb WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_customer).transpose()
    }

    async fn customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers_tb \
             WHERE ($1::SMALLINT IS NULL OR customer_type = $1) \
               AND ($2::SMALLINT IS NULL OR status = $2) \
               AND ($3::TEXT IS NULL \
                    OR customer_number ILIKE $3 OR company_name ILIKE $3 \
                    OR first_name ILIKE $3 OR last_name ILIKE $3 \
                    OR email ILIKE $3 OR phone ILIKE $3) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.customer_type.map(|t| t.id()))
        .bind(filter.status.map(|s| s.id()))
        .bind(filter.search.as_deref().map(|q| format!("%{q}%")))
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_customer).collect()
    }

    async fn customer_order_summary(
        &self,
        customer_id: EntityId,
    ) -> Result<CustomerOrderSummary, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_orders, \
                    COUNT(*) FILTER (WHERE status = $2) AS completed_orders, \
                    COALESCE(SUM(total_amount), 0) AS total_amount, \
                    MAX(created_at) AS last_order_at \
             FROM orders_tb WHERE customer_id = $1",
        )
        .bind(customer_id.to_string())
        .bind(OrderStatus::Delivered.id())
        .fetch_one(&self.pool)
        .await?;
        let total_orders: i64 = row.try_get("total_orders")?;
        let completed_orders: i64 = row.try_get("completed_orders")?;
        let total_amount: Decimal = row.try_get("total_amount")?;
        let last_order_at: Option<DateTime<Utc>> = row.try_get("last_order_at")?;
        Ok(CustomerOrderSummary {
            total_orders: total_orders.max(0) as u64,
            completed_orders: completed_orders.max(0) as u64,
            total_amount,
            last_order_at,
        })
    }

    async fn order(&self, id: EntityId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders_tb WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders_tb \
             WHERE ($1::SMALLINT IS NULL OR status = $1) \
               AND ($2::TEXT IS NULL OR customer_id = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(filter.status.map(|s| s.id()))
        .bind(filter.customer_id.map(|c| c.to_string()))
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order).collect()
    }

    async fn orders_created_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders_tb \
             WHERE ($1::TIMESTAMPTZ IS NULL OR created_at >= $1) \
               AND ($2::TIMESTAMPTZ IS NULL OR created_at <= $2)"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order).collect()
    }

    async fn vehicle(&self, id: EntityId) -> Result<Option<Vehicle>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles_tb WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_vehicle).transpose()
    }

    async fn vehicle_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles_tb WHERE license_plate = $1"
        ))
        .bind(plate)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_vehicle).transpose()
    }

    async fn vehicles(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles_tb \
             WHERE ($1::SMALLINT IS NULL OR status = $1) \
               AND ($2::SMALLINT IS NULL OR vehicle_type = $2) \
             ORDER BY license_plate \
             LIMIT $3 OFFSET $4"
        ))
        .bind(filter.status.map(|s| s.id()))
        .bind(filter.vehicle_type.map(|t| t.id()))
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_vehicle).collect()
    }

    async fn available_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles_tb \
             WHERE is_active AND status = $1 ORDER BY license_plate"
        ))
        .bind(VehicleStatus::Available.id())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_vehicle).collect()
    }

    async fn driver(&self, id: EntityId) -> Result<Option<Driver>, StoreError> {
        let row = sqlx::query(&format!("SELECT {DRIVER_COLUMNS} FROM drivers_tb WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_driver).transpose()
    }

    async fn drivers(&self, filter: &DriverFilter) -> Result<Vec<Driver>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers_tb \
             WHERE ($1::SMALLINT IS NULL OR status = $1) \
             ORDER BY name, id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(filter.status.map(|s| s.id()))
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_driver).collect()
    }

    async fn dispatch(&self, id: EntityId) -> Result<Option<Dispatch>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {DISPATCH_COLUMNS} FROM dispatches_tb WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_dispatch).transpose()
    }

    async fn dispatches(&self, filter: &DispatchFilter) -> Result<Vec<Dispatch>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {DISPATCH_COLUMNS} FROM dispatches_tb \
             WHERE ($1::SMALLINT IS NULL OR status = $1) \
               AND ($2::TEXT IS NULL OR vehicle_id = $2) \
               AND ($3::TEXT IS NULL OR driver_id = $3) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.status.map(|s| s.id()))
        .bind(filter.vehicle_id.map(|v| v.to_string()))
        .bind(filter.driver_id.map(|d| d.to_string()))
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_dispatch).collect()
    }

    async fn shipment(&self, id: EntityId) -> Result<Option<Shipment>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments_tb WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_shipment).transpose()
    }

    async fn shipments_for_dispatch(
        &self,
        dispatch_id: EntityId,
    ) -> Result<Vec<Shipment>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments_tb WHERE dispatch_id = $1 ORDER BY sequence"
        ))
        .bind(dispatch_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_shipment).collect()
    }

    async fn shipments_for_order(&self, order_id: EntityId) -> Result<Vec<Shipment>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments_tb WHERE order_id = $1 \
             ORDER BY created_at, id"
        ))
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_shipment).collect()
    }

    async fn open_shipments_for_driver(&self, driver_id: EntityId) -> Result<u64, StoreError> {
        self.count_open_shipments("driver_id", driver_id).await
    }

    async fn open_shipments_for_vehicle(&self, vehicle_id: EntityId) -> Result<u64, StoreError> {
        self.count_open_shipments("vehicle_id", vehicle_id).await
    }

    async fn pod(&self, id: EntityId) -> Result<Option<Pod>, StoreError> {
        let row = sqlx::query(&format!("SELECT {POD_COLUMNS} FROM pods_tb WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_pod).transpose()
    }

    async fn tracking_points(
        &self,
        shipment_id: EntityId,
    ) -> Result<Vec<TrackingPoint>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRACKING_COLUMNS} FROM tracking_points_tb \
             WHERE shipment_id = $1 ORDER BY recorded_at, id"
        ))
        .bind(shipment_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_tracking).collect()
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        insert_order_row(&mut conn, order).await?;
        tracing::info!(order_id = %order.id, order_number = %order.order_number, "Order created");
        Ok(())
    }

    async fn insert_vehicle(&self, v: &Vehicle) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO vehicles_tb ({VEHICLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(v.id.to_string())
        .bind(&v.license_plate)
        .bind(v.vehicle_type.id())
        .bind(v.max_load)
        .bind(v.max_volume)
        .bind(v.status.id())
        .bind(v.driver_id.map(|d| d.to_string()))
        .bind(v.is_active)
        .bind(v.created_at)
        .bind(v.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("license plate {}", v.license_plate)))?;
        Ok(())
    }

    async fn insert_driver(&self, d: &Driver) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO drivers_tb ({DRIVER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(d.id.to_string())
        .bind(&d.name)
        .bind(&d.phone)
        .bind(&d.license_number)
        .bind(d.status.id())
        .bind(d.created_at)
        .bind(d.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_customer(&self, c: &Customer) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO customers_tb ({CUSTOMER_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"
        ))
        .bind(c.id.to_string())
        .bind(&c.customer_number)
        .bind(c.customer_type.id())
        .bind(&c.company_name)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.address)
        .bind(&c.city)
        .bind(&c.province)
        .bind(&c.postal_code)
        .bind(c.status.id())
        .bind(c.credit_rating)
        .bind(c.credit_limit)
        .bind(&c.notes)
        .bind(&c.created_by)
        .bind(&c.updated_by)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("email {}", c.email)))?;
        Ok(())
    }

    async fn append_tracking(&self, points: &[TrackingPoint]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for p in points {
            sqlx::query(&format!(
                "INSERT INTO tracking_points_tb ({TRACKING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ))
            .bind(p.id.to_string())
            .bind(p.shipment_id.to_string())
            .bind(p.latitude)
            .bind(p.longitude)
            .bind(p.speed)
            .bind(p.heading)
            .bind(p.altitude)
            .bind(p.battery_level)
            .bind(p.recorded_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn apply(&self, intents: &[WriteIntent]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for intent in intents {
            if let Err(e) = apply_intent(&mut tx, intent).await {
                tracing::warn!(intent = intent.label(), error = %e, "Write batch aborted");
                // Dropping `tx` rolls back
                return Err(e);
            }
        }
        tx.commit().await?;
        tracing::debug!(intents = intents.len(), "Write batch committed");
        Ok(())
    }
}
