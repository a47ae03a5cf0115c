//! Domain records and patches.
//!
//! Records are what the store returns. Patches are partial updates carried
//! by write intents: `None` leaves a field untouched.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{EntityId, document_number, prefix};
use crate::lifecycle::state::{
    CustomerStatus, DispatchStatus, DriverStatus, OrderStatus, PodStatus, ShipmentStatus,
    VehicleStatus, status_codes,
};

/// Shipment window when the caller gives no estimate
pub const DEFAULT_TRANSIT_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum Priority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Urgent = 4,
}

status_codes!(Priority {
    Low = "LOW",
    Medium = "MEDIUM",
    High = "HIGH",
    Urgent = "URGENT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum PaymentStatus {
    #[default]
    Pending = 0,
    Paid = 10,
    Overdue = 20,
    Refunded = -10,
}

status_codes!(PaymentStatus {
    Pending = "PENDING",
    Paid = "PAID",
    Overdue = "OVERDUE",
    Refunded = "REFUNDED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum VehicleType {
    Truck = 1,
    Van = 2,
    Trailer = 3,
}

status_codes!(VehicleType {
    Truck = "TRUCK",
    Van = "VAN",
    Trailer = "TRAILER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum CustomerType {
    Company = 1,
    Individual = 2,
}

status_codes!(CustomerType {
    Company = "COMPANY",
    Individual = "INDIVIDUAL",
});

/// What is being moved. Weight in kg, volume in m³.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub name: String,
    pub weight: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: EntityId,
    pub order_number: String,
    pub customer_id: EntityId,
    pub status: OrderStatus,
    pub priority: Priority,
    pub payment_status: PaymentStatus,
    pub cargo: Cargo,
    pub origin_address: String,
    pub destination_address: String,
    pub total_amount: Decimal,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub expected_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: EntityId,
    pub cargo: Cargo,
    pub origin_address: String,
    pub destination_address: String,
    pub priority: Priority,
    pub distance_km: Option<Decimal>,
    pub expected_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Order {
    /// A fresh PENDING order priced at `total_amount`
    pub fn pending(
        draft: NewOrder,
        total_amount: Decimal,
        actor: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            order_number: document_number(prefix::ORDER, now),
            customer_id: draft.customer_id,
            status: OrderStatus::Pending,
            priority: draft.priority,
            payment_status: PaymentStatus::Pending,
            cargo: draft.cargo,
            origin_address: draft.origin_address,
            destination_address: draft.destination_address,
            total_amount,
            pickup_time: None,
            delivery_time: None,
            expected_time: draft.expected_time,
            notes: draft.notes,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A shipper account. Orders reference it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: EntityId,
    /// `C…` for companies, `I…` for individuals
    pub customer_number: String,
    pub customer_type: CustomerType,
    pub company_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Unique across customers
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: Option<String>,
    pub status: CustomerStatus,
    /// 0..=100
    pub credit_rating: Option<i16>,
    pub credit_limit: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub customer_type: CustomerType,
    pub company_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: Option<String>,
    pub credit_rating: Option<i16>,
    pub credit_limit: Option<Decimal>,
    pub notes: Option<String>,
}

impl Customer {
    /// A fresh ACTIVE customer
    pub fn register(draft: NewCustomer, actor: Option<String>, now: DateTime<Utc>) -> Self {
        let number_prefix = match draft.customer_type {
            CustomerType::Company => prefix::COMPANY_CUSTOMER,
            CustomerType::Individual => prefix::INDIVIDUAL_CUSTOMER,
        };
        Self {
            id: EntityId::new(),
            customer_number: document_number(number_prefix, now),
            customer_type: draft.customer_type,
            company_name: draft.company_name,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            city: draft.city,
            province: draft.province,
            postal_code: draft.postal_code,
            status: CustomerStatus::Active,
            credit_rating: draft.credit_rating,
            credit_limit: draft.credit_limit.unwrap_or(Decimal::ZERO),
            notes: draft.notes,
            created_by: actor.clone(),
            updated_by: actor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Company name, or "first last" for individuals
    pub fn display_name(&self) -> String {
        match self.customer_type {
            CustomerType::Company => self.company_name.clone().unwrap_or_default(),
            CustomerType::Individual => [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: EntityId,
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    pub max_load: Decimal,
    pub max_volume: Decimal,
    pub status: VehicleStatus,
    pub driver_id: Option<EntityId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    pub max_load: Decimal,
    pub max_volume: Decimal,
    pub driver_id: Option<EntityId>,
}

impl Vehicle {
    pub fn register(draft: NewVehicle, now: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(),
            license_plate: draft.license_plate,
            vehicle_type: draft.vehicle_type,
            max_load: draft.max_load,
            max_volume: draft.max_volume,
            status: VehicleStatus::Available,
            driver_id: draft.driver_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Can take a new assignment
    #[inline]
    pub fn is_assignable(&self) -> bool {
        self.is_active && self.status == VehicleStatus::Available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: EntityId,
    pub name: String,
    pub phone: String,
    pub license_number: String,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDriver {
    pub name: String,
    pub phone: String,
    pub license_number: String,
}

impl Driver {
    pub fn register(draft: NewDriver, now: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(),
            name: draft.name,
            phone: draft.phone,
            license_number: draft.license_number,
            status: DriverStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: EntityId,
    pub dispatch_number: String,
    pub vehicle_id: EntityId,
    pub driver_id: EntityId,
    pub status: DispatchStatus,
    pub planned_departure: DateTime<Utc>,
    /// Hours
    pub estimated_duration: Option<Decimal>,
    /// Kilometres
    pub estimated_distance: Option<Decimal>,
    pub departed_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub actual_distance: Option<Decimal>,
    pub actual_duration: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDispatch {
    pub order_ids: Vec<EntityId>,
    pub vehicle_id: EntityId,
    pub driver_id: EntityId,
    pub planned_departure: Option<DateTime<Utc>>,
    pub estimated_duration: Option<Decimal>,
    pub estimated_distance: Option<Decimal>,
}

impl Dispatch {
    pub fn scheduled(draft: &NewDispatch, now: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(),
            dispatch_number: document_number(prefix::DISPATCH, now),
            vehicle_id: draft.vehicle_id,
            driver_id: draft.driver_id,
            status: DispatchStatus::Scheduled,
            planned_departure: draft.planned_departure.unwrap_or(now),
            estimated_duration: draft.estimated_duration,
            estimated_distance: draft.estimated_distance,
            departed_at: None,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            actual_distance: None,
            actual_duration: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: EntityId,
    pub shipment_number: String,
    pub order_id: EntityId,
    pub dispatch_id: Option<EntityId>,
    pub vehicle_id: EntityId,
    pub driver_id: Option<EntityId>,
    pub status: ShipmentStatus,
    pub sequence: i32,
    pub estimated_departure: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// A SCHEDULED shipment departing at `departure`, arriving `transit` later
    #[allow(clippy::too_many_arguments)]
    pub fn scheduled(
        order_id: EntityId,
        dispatch_id: Option<EntityId>,
        vehicle_id: EntityId,
        driver_id: Option<EntityId>,
        sequence: i32,
        departure: DateTime<Utc>,
        transit: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            shipment_number: document_number(prefix::SHIPMENT, now),
            order_id,
            dispatch_id,
            vehicle_id,
            driver_id,
            status: ShipmentStatus::Scheduled,
            sequence,
            estimated_departure: departure,
            estimated_arrival: departure + transit,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Proof-of-delivery document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub id: EntityId,
    pub pod_number: String,
    pub order_id: EntityId,
    pub status: PodStatus,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_url: String,
    pub file_size: i64,
    pub mime_type: String,
    pub checksum: String,
    pub receiver_name: Option<String>,
    pub receiver_signature: Option<String>,
    pub delivery_photo: Option<String>,
    pub delivery_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub uploaded_by: Option<String>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPoint {
    pub id: EntityId,
    pub shipment_id: EntityId,
    pub latitude: f64,
    pub longitude: f64,
    /// km/h
    pub speed: f64,
    /// Degrees, `[0, 360)`
    pub heading: f64,
    pub altitude: Option<f64>,
    /// Percent
    pub battery_level: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// Patches
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl OrderPatch {
    pub fn apply_to(&self, order: &mut Order, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(payment) = self.payment_status {
            order.payment_status = payment;
        }
        if let Some(t) = self.pickup_time {
            order.pickup_time = Some(t);
        }
        if let Some(t) = self.delivery_time {
            order.delivery_time = Some(t);
        }
        if let Some(actor) = &self.updated_by {
            order.updated_by = Some(actor.clone());
        }
        order.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehiclePatch {
    pub status: Option<VehicleStatus>,
    /// `Some(None)` unassigns the driver
    pub driver_id: Option<Option<EntityId>>,
    pub is_active: Option<bool>,
    pub license_plate: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub max_load: Option<Decimal>,
    pub max_volume: Option<Decimal>,
}

impl VehiclePatch {
    pub fn apply_to(&self, vehicle: &mut Vehicle, now: DateTime<Utc>) {
        if let Some(plate) = &self.license_plate {
            vehicle.license_plate = plate.clone();
        }
        if let Some(vehicle_type) = self.vehicle_type {
            vehicle.vehicle_type = vehicle_type;
        }
        if let Some(load) = self.max_load {
            vehicle.max_load = load;
        }
        if let Some(volume) = self.max_volume {
            vehicle.max_volume = volume;
        }
        if let Some(status) = self.status {
            vehicle.status = status;
        }
        if let Some(driver_id) = self.driver_id {
            vehicle.driver_id = driver_id;
        }
        if let Some(active) = self.is_active {
            vehicle.is_active = active;
        }
        vehicle.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverPatch {
    pub status: Option<DriverStatus>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
}

impl DriverPatch {
    pub fn apply_to(&self, driver: &mut Driver, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            driver.status = status;
        }
        if let Some(name) = &self.name {
            driver.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            driver.phone = phone.clone();
        }
        if let Some(license) = &self.license_number {
            driver.license_number = license.clone();
        }
        driver.updated_at = now;
    }
}

/// Customer edits. `notes` replaces the whole text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerPatch {
    pub status: Option<CustomerStatus>,
    pub company_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub credit_rating: Option<i16>,
    pub credit_limit: Option<Decimal>,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
}

impl CustomerPatch {
    pub fn apply_to(&self, customer: &mut Customer, now: DateTime<Utc>) {
        fn set(field: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                field.clone_from(value);
            }
        }

        if let Some(status) = self.status {
            customer.status = status;
        }
        set(&mut customer.company_name, &self.company_name);
        set(&mut customer.first_name, &self.first_name);
        set(&mut customer.last_name, &self.last_name);
        if let Some(email) = &self.email {
            customer.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            customer.phone = phone.clone();
        }
        if let Some(address) = &self.address {
            customer.address = address.clone();
        }
        if let Some(city) = &self.city {
            customer.city = city.clone();
        }
        if let Some(province) = &self.province {
            customer.province = province.clone();
        }
        set(&mut customer.postal_code, &self.postal_code);
        if self.credit_rating.is_some() {
            customer.credit_rating = self.credit_rating;
        }
        if let Some(limit) = self.credit_limit {
            customer.credit_limit = limit;
        }
        set(&mut customer.notes, &self.notes);
        set(&mut customer.updated_by, &self.updated_by);
        customer.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchPatch {
    pub status: Option<DispatchStatus>,
    pub departed_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub actual_distance: Option<Decimal>,
    pub actual_duration: Option<Decimal>,
}

impl DispatchPatch {
    pub fn apply_to(&self, dispatch: &mut Dispatch, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            dispatch.status = status;
        }
        if self.departed_at.is_some() {
            dispatch.departed_at = self.departed_at;
        }
        if self.arrived_at.is_some() {
            dispatch.arrived_at = self.arrived_at;
        }
        if self.completed_at.is_some() {
            dispatch.completed_at = self.completed_at;
        }
        if self.cancelled_at.is_some() {
            dispatch.cancelled_at = self.cancelled_at;
        }
        if let Some(reason) = &self.cancel_reason {
            dispatch.cancel_reason = Some(reason.clone());
        }
        if self.actual_distance.is_some() {
            dispatch.actual_distance = self.actual_distance;
        }
        if self.actual_duration.is_some() {
            dispatch.actual_duration = self.actual_duration;
        }
        dispatch.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentPatch {
    pub status: Option<ShipmentStatus>,
}

impl ShipmentPatch {
    pub fn apply_to(&self, shipment: &mut Shipment, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            shipment.status = status;
        }
        shipment.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodPatch {
    pub status: Option<PodStatus>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl PodPatch {
    pub fn apply_to(&self, pod: &mut Pod, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            pod.status = status;
        }
        if let Some(by) = &self.verified_by {
            pod.verified_by = Some(by.clone());
        }
        if self.verified_at.is_some() {
            pod.verified_at = self.verified_at;
        }
        if let Some(reason) = &self.rejection_reason {
            pod.rejection_reason = Some(reason.clone());
        }
        pod.updated_at = now;
    }
}
