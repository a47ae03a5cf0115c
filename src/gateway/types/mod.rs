//! Gateway types
//!
//! - [`request`]: request DTOs with `validator` rules
//! - [`response`]: the `{success, data?, error?, message?}` envelope and `ApiError`
//! - [`extract`]: JSON extractors that reject into the envelope

pub mod extract;
pub mod request;
pub mod response;

pub use extract::{JsonBody, ValidatedJson};
pub use request::{
    CreateCustomerRequest, CreateDispatchRequest, CreateDriverRequest, CreateOrderRequest,
    CreateVehicleRequest, CustomerListQuery, CustomerStatusRequest, DispatchListQuery,
    DriverListQuery, OrderListQuery, StatisticsQuery, TrackingBatchRequest,
    UpdateCustomerRequest, UpdateDispatchStatusRequest, UpdateDriverRequest,
    UpdateOrderStatusRequest, UpdateVehicleRequest, UploadPodRequest, VehicleListQuery,
};
pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
