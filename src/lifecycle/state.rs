//! Lifecycle Status Definitions
//!
//! Status IDs are persisted as SMALLINT. Negative IDs mark the "unhappy"
//! terminal branches (cancelled, returned, rejected) so they sort apart
//! from the forward path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a wire or database value does not name a known status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} value: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// Generates the SMALLINT and wire-name conversions shared by every
/// status-like enum. Variant names must match the serde
/// `SCREAMING_SNAKE_CASE` spelling given here.
macro_rules! status_codes {
    ($name:ident { $($variant:ident = $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Numeric ID for PostgreSQL storage
            #[inline]
            pub fn id(&self) -> i16 {
                *self as i16
            }

            pub fn from_id(id: i16) -> Option<Self> {
                Self::ALL.iter().copied().find(|s| s.id() == id)
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::lifecycle::state::UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::lifecycle::state::UnknownStatus {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<i16> for $name {
            type Error = ();

            fn try_from(value: i16) -> Result<Self, Self::Error> {
                $name::from_id(value).ok_or(())
            }
        }
    };
}

pub(crate) use status_codes;

/// Entity kinds, used to tag errors and status changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Order,
    Dispatch,
    Pod,
    Vehicle,
    Driver,
    Shipment,
    Customer,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Order => "Order",
            EntityKind::Dispatch => "Dispatch",
            EntityKind::Pod => "POD",
            EntityKind::Vehicle => "Vehicle",
            EntityKind::Driver => "Driver",
            EntityKind::Shipment => "Shipment",
            EntityKind::Customer => "Customer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ORDER" => Ok(EntityKind::Order),
            "DISPATCH" => Ok(EntityKind::Dispatch),
            "POD" => Ok(EntityKind::Pod),
            "VEHICLE" => Ok(EntityKind::Vehicle),
            "DRIVER" => Ok(EntityKind::Driver),
            "SHIPMENT" => Ok(EntityKind::Shipment),
            "CUSTOMER" => Ok(EntityKind::Customer),
            _ => Err(UnknownStatus {
                kind: "EntityKind",
                value: s.to_string(),
            }),
        }
    }
}

/// Order lifecycle status
///
/// Terminal: DELIVERED (30), CANCELLED (-10).
/// RETURNED (-20) may re-enter IN_TRANSIT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum OrderStatus {
    /// Created, awaiting confirmation
    Pending = 0,
    /// Accepted, ready to be loaded
    Confirmed = 10,
    /// On a vehicle
    InTransit = 20,
    /// Terminal: handed over to the receiver
    Delivered = 30,
    /// Terminal: cancelled before pickup
    Cancelled = -10,
    /// Brought back after a failed or aborted delivery
    Returned = -20,
}

status_codes!(OrderStatus {
    Pending = "PENDING",
    Confirmed = "CONFIRMED",
    InTransit = "IN_TRANSIT",
    Delivered = "DELIVERED",
    Cancelled = "CANCELLED",
    Returned = "RETURNED",
});

/// Dispatch (vehicle run) status
///
/// Terminal: COMPLETED (40), CANCELLED (-10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum DispatchStatus {
    /// Planned, vehicle and driver reserved
    Scheduled = 0,
    /// Left the depot
    Departed = 10,
    /// On the road
    InTransit = 20,
    /// Reached the destination
    Arrived = 30,
    /// Terminal: run closed, resources released
    Completed = 40,
    /// Terminal: aborted with a reason, resources released
    Cancelled = -10,
}

status_codes!(DispatchStatus {
    Scheduled = "SCHEDULED",
    Departed = "DEPARTED",
    InTransit = "IN_TRANSIT",
    Arrived = "ARRIVED",
    Completed = "COMPLETED",
    Cancelled = "CANCELLED",
});

impl DispatchStatus {
    /// True once the vehicle has left (any state past SCHEDULED, excluding CANCELLED)
    pub fn has_departed(&self) -> bool {
        matches!(
            self,
            DispatchStatus::Departed
                | DispatchStatus::InTransit
                | DispatchStatus::Arrived
                | DispatchStatus::Completed
        )
    }
}

/// Proof-of-delivery review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum PodStatus {
    Uploaded = 0,
    Verified = 10,
    Rejected = -10,
}

status_codes!(PodStatus {
    Uploaded = "UPLOADED",
    Verified = "VERIFIED",
    Rejected = "REJECTED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum VehicleStatus {
    Available = 0,
    InTransit = 10,
    Maintenance = 20,
    /// Soft-deleted
    Inactive = -10,
}

status_codes!(VehicleStatus {
    Available = "AVAILABLE",
    InTransit = "IN_TRANSIT",
    Maintenance = "MAINTENANCE",
    Inactive = "INACTIVE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum DriverStatus {
    Available = 0,
    OnDuty = 10,
    OffDuty = 20,
}

status_codes!(DriverStatus {
    Available = "AVAILABLE",
    OnDuty = "ON_DUTY",
    OffDuty = "OFF_DUTY",
});

/// Shipment (one order on one vehicle run) status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum ShipmentStatus {
    Scheduled = 0,
    InTransit = 10,
    Completed = 20,
    Cancelled = -10,
}

status_codes!(ShipmentStatus {
    Scheduled = "SCHEDULED",
    InTransit = "IN_TRANSIT",
    Completed = "COMPLETED",
    Cancelled = "CANCELLED",
});

/// Customer account standing. Only ACTIVE customers may place orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum CustomerStatus {
    Active = 0,
    Inactive = 10,
    Suspended = 20,
    Blacklisted = -10,
}

status_codes!(CustomerStatus {
    Active = "ACTIVE",
    Inactive = "INACTIVE",
    Suspended = "SUSPENDED",
    Blacklisted = "BLACKLISTED",
});

impl ShipmentStatus {
    /// Scheduled or moving
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, ShipmentStatus::Scheduled | ShipmentStatus::InTransit)
    }
}
