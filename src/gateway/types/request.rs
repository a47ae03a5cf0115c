//! Request DTOs
//!
//! Shape and range checks run in the extractor via `validator`; lifecycle
//! rules stay in the service.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::core_types::EntityId;
use crate::lifecycle::{CustomerStatus, DispatchStatusCommand, OrderStatusCommand, PodUpload};
use crate::models::{
    Cargo, CustomerPatch, CustomerType, DriverPatch, NewCustomer, NewDispatch, NewDriver,
    NewOrder, NewVehicle, Priority, VehiclePatch, VehicleType,
};
use crate::pod::PodDetails;
use crate::store::{CustomerFilter, DispatchFilter, DriverFilter, OrderFilter, VehicleFilter};
use crate::tracking::LocationUpdate;

use super::response::ApiError;

pub const MAX_PAGE_SIZE: u32 = 200;

fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive"))
    }
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::new("must_not_be_negative"))
    } else {
        Ok(())
    }
}

fn ensure_non_negative(field: &str, value: Option<Decimal>) -> Result<(), ApiError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(ApiError::bad_request(format!(
            "{field} must not be negative"
        ))),
        _ => Ok(()),
    }
}

fn ensure_positive(field: &str, value: Option<Decimal>) -> Result<(), ApiError> {
    match value {
        Some(v) if v <= Decimal::ZERO => {
            Err(ApiError::bad_request(format!("{field} must be positive")))
        }
        _ => Ok(()),
    }
}

/// Absent stays `None`; an explicit `null` becomes `Some(None)`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn page(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
}

fn parse_query_id(field: &str, raw: Option<String>) -> Result<Option<EntityId>, ApiError> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| {
            r.trim()
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Invalid {field}: {r}")))
        })
        .transpose()
}

/// Status names are accepted in any case
fn parse_status<S: FromStr>(raw: &str) -> Result<S, ApiError>
where
    S::Err: std::fmt::Display,
{
    raw.trim()
        .to_ascii_uppercase()
        .parse()
        .map_err(|e: S::Err| ApiError::bad_request(e.to_string()))
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CargoRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(custom(function = "positive"))]
    pub weight: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub volume: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub customer_id: EntityId,
    #[validate(nested)]
    pub cargo: CargoRequest,
    #[validate(length(min = 1, max = 255))]
    pub origin_address: String,
    #[validate(length(min = 1, max = 255))]
    pub destination_address: String,
    #[serde(default)]
    pub priority: Priority,
    pub distance_km: Option<Decimal>,
    pub expected_time: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_draft(self) -> Result<NewOrder, ApiError> {
        ensure_non_negative("distance_km", self.distance_km)?;
        Ok(NewOrder {
            customer_id: self.customer_id,
            cargo: Cargo {
                name: self.cargo.name,
                weight: self.cargo.weight,
                volume: self.cargo.volume,
            },
            origin_address: self.origin_address,
            destination_address: self.destination_address,
            priority: self.priority,
            distance_km: self.distance_km,
            expected_time: self.expected_time,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl OrderListQuery {
    pub fn into_filter(self) -> Result<OrderFilter, ApiError> {
        let defaults = OrderFilter::default();
        Ok(OrderFilter {
            status: self.status.as_deref().map(parse_status).transpose()?,
            customer_id: parse_query_id("customer_id", self.customer_id)?,
            limit: page(self.limit, defaults.limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

/// Reporting window over order creation time; either end may be open
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
    pub vehicle_id: Option<EntityId>,
    pub driver_id: Option<EntityId>,
}

impl UpdateOrderStatusRequest {
    pub fn into_command(self) -> Result<OrderStatusCommand, ApiError> {
        Ok(OrderStatusCommand {
            status: parse_status(&self.status)?,
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
        })
    }
}

// ============================================================================
// Fleet
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 20))]
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    #[validate(custom(function = "positive"))]
    pub max_load: Decimal,
    #[validate(custom(function = "positive"))]
    pub max_volume: Decimal,
    pub driver_id: Option<EntityId>,
}

impl From<CreateVehicleRequest> for NewVehicle {
    fn from(req: CreateVehicleRequest) -> Self {
        NewVehicle {
            license_plate: req.license_plate.trim().to_string(),
            vehicle_type: req.vehicle_type,
            max_load: req.max_load,
            max_volume: req.max_volume,
            driver_id: req.driver_id,
        }
    }
}

/// Partial vehicle edit. `driver_id: null` unassigns the driver.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 20))]
    pub license_plate: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub max_load: Option<Decimal>,
    pub max_volume: Option<Decimal>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub driver_id: Option<Option<EntityId>>,
}

impl UpdateVehicleRequest {
    pub fn into_patch(self) -> Result<VehiclePatch, ApiError> {
        ensure_positive("max_load", self.max_load)?;
        ensure_positive("max_volume", self.max_volume)?;
        Ok(VehiclePatch {
            status: self.status.as_deref().map(parse_status).transpose()?,
            driver_id: self.driver_id,
            is_active: None,
            license_plate: self.license_plate.map(|p| p.trim().to_string()),
            vehicle_type: self.vehicle_type,
            max_load: self.max_load,
            max_volume: self.max_volume,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VehicleListQuery {
    pub status: Option<String>,
    pub vehicle_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl VehicleListQuery {
    pub fn into_filter(self) -> Result<VehicleFilter, ApiError> {
        Ok(VehicleFilter {
            status: self.status.as_deref().map(parse_status).transpose()?,
            vehicle_type: self.vehicle_type.as_deref().map(parse_status).transpose()?,
            limit: page(self.limit, VehicleFilter::default().limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDriverRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 3, max = 32))]
    pub phone: String,
    #[validate(length(min = 1, max = 32))]
    pub license_number: String,
}

impl From<CreateDriverRequest> for NewDriver {
    fn from(req: CreateDriverRequest) -> Self {
        NewDriver {
            name: req.name,
            phone: req.phone,
            license_number: req.license_number,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDriverRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub license_number: Option<String>,
    pub status: Option<String>,
}

impl UpdateDriverRequest {
    pub fn into_patch(self) -> Result<DriverPatch, ApiError> {
        Ok(DriverPatch {
            status: self.status.as_deref().map(parse_status).transpose()?,
            name: self.name,
            phone: self.phone,
            license_number: self.license_number,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DriverListQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl DriverListQuery {
    pub fn into_filter(self) -> Result<DriverFilter, ApiError> {
        Ok(DriverFilter {
            status: self.status.as_deref().map(parse_status).transpose()?,
            limit: page(self.limit, DriverFilter::default().limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

// ============================================================================
// Customers
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    pub customer_type: CustomerType,
    #[validate(length(min = 1, max = 128))]
    pub company_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 32))]
    pub phone: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 64))]
    pub city: String,
    #[validate(length(min = 1, max = 64))]
    pub province: String,
    #[validate(length(max = 16))]
    pub postal_code: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub credit_rating: Option<i16>,
    pub credit_limit: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreateCustomerRequest {
    pub fn into_draft(self) -> Result<NewCustomer, ApiError> {
        ensure_non_negative("credit_limit", self.credit_limit)?;
        Ok(NewCustomer {
            customer_type: self.customer_type,
            company_name: self.company_name,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.trim().to_string(),
            phone: self.phone,
            address: self.address,
            city: self.city,
            province: self.province,
            postal_code: self.postal_code,
            credit_rating: self.credit_rating,
            credit_limit: self.credit_limit,
            notes: self.notes,
        })
    }
}

/// Partial customer edit; status has its own endpoint
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 128))]
    pub company_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub province: Option<String>,
    #[validate(length(max = 16))]
    pub postal_code: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub credit_rating: Option<i16>,
    pub credit_limit: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl UpdateCustomerRequest {
    pub fn into_patch(self) -> Result<CustomerPatch, ApiError> {
        ensure_non_negative("credit_limit", self.credit_limit)?;
        Ok(CustomerPatch {
            company_name: self.company_name,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.map(|e| e.trim().to_string()),
            phone: self.phone,
            address: self.address,
            city: self.city,
            province: self.province,
            postal_code: self.postal_code,
            credit_rating: self.credit_rating,
            credit_limit: self.credit_limit,
            notes: self.notes,
            ..Default::default()
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

impl CustomerStatusRequest {
    pub fn parse_status(&self) -> Result<CustomerStatus, ApiError> {
        parse_status(&self.status)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    pub customer_type: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl CustomerListQuery {
    pub fn into_filter(self) -> Result<CustomerFilter, ApiError> {
        Ok(CustomerFilter {
            customer_type: self.customer_type.as_deref().map(parse_status).transpose()?,
            status: self.status.as_deref().map(parse_status).transpose()?,
            search: self
                .search
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            limit: page(self.limit, CustomerFilter::default().limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

// ============================================================================
// Dispatch
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDispatchRequest {
    #[validate(length(min = 1, max = 50))]
    pub order_ids: Vec<EntityId>,
    pub vehicle_id: EntityId,
    pub driver_id: EntityId,
    pub planned_departure: Option<DateTime<Utc>>,
    /// Hours
    pub estimated_duration: Option<Decimal>,
    /// Kilometres
    pub estimated_distance: Option<Decimal>,
}

impl CreateDispatchRequest {
    pub fn into_draft(self) -> Result<NewDispatch, ApiError> {
        ensure_non_negative("estimated_duration", self.estimated_duration)?;
        ensure_non_negative("estimated_distance", self.estimated_distance)?;
        Ok(NewDispatch {
            order_ids: self.order_ids,
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            planned_departure: self.planned_departure,
            estimated_duration: self.estimated_duration,
            estimated_distance: self.estimated_distance,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DispatchListQuery {
    pub status: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl DispatchListQuery {
    pub fn into_filter(self) -> Result<DispatchFilter, ApiError> {
        Ok(DispatchFilter {
            status: self.status.as_deref().map(parse_status).transpose()?,
            vehicle_id: parse_query_id("vehicle_id", self.vehicle_id)?,
            driver_id: parse_query_id("driver_id", self.driver_id)?,
            limit: page(self.limit, DispatchFilter::default().limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDispatchStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub actual_distance: Option<Decimal>,
    pub actual_duration: Option<Decimal>,
}

impl UpdateDispatchStatusRequest {
    pub fn into_command(self) -> Result<DispatchStatusCommand, ApiError> {
        ensure_non_negative("actual_distance", self.actual_distance)?;
        ensure_non_negative("actual_duration", self.actual_duration)?;
        Ok(DispatchStatusCommand {
            status: Some(parse_status(&self.status)?),
            reason: self.reason,
            actual_distance: self.actual_distance,
            actual_duration: self.actual_duration,
        })
    }
}

// ============================================================================
// Proof of delivery / tracking
// ============================================================================

/// POD upload with the file inlined as base64
#[derive(Debug, Deserialize, Validate)]
pub struct UploadPodRequest {
    pub order_id: EntityId,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub mime_type: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(max = 64))]
    pub receiver_name: Option<String>,
    pub receiver_signature: Option<String>,
    pub delivery_photo: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl UploadPodRequest {
    pub fn into_upload(self) -> Result<PodUpload, ApiError> {
        let content = STANDARD
            .decode(self.content.trim())
            .map_err(|e| ApiError::bad_request(format!("content is not valid base64: {e}")))?;
        Ok(PodUpload {
            order_id: self.order_id,
            file_name: self.file_name,
            mime_type: self.mime_type.trim().to_ascii_lowercase(),
            content,
            details: PodDetails {
                receiver_name: self.receiver_name,
                receiver_signature: self.receiver_signature,
                delivery_photo: self.delivery_photo,
                delivery_time: self.delivery_time,
                notes: self.notes,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackingBatchRequest {
    pub shipment_id: EntityId,
    pub points: Vec<LocationUpdate>,
}
