//! Core types used throughout the system
//!
//! Every persisted entity is keyed by an [`EntityId`]. Human-facing document
//! numbers (customers, orders, shipments, dispatches, PODs) are generated by
//! [`document_number`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Entity ID - ULID, lexicographically sortable by creation time.
///
/// Stored as its 26-character Crockford base32 string in PostgreSQL
/// and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Ulid);

impl EntityId {
    /// Generate a new ID for the current instant
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn inner(&self) -> Ulid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Document number prefixes
pub mod prefix {
    pub const ORDER: &str = "ORD";
    pub const SHIPMENT: &str = "SHIP";
    pub const DISPATCH: &str = "DISP";
    pub const POD: &str = "POD";
    pub const COMPANY_CUSTOMER: &str = "C";
    pub const INDIVIDUAL_CUSTOMER: &str = "I";
}

/// Build a document number: prefix, last 6 digits of the epoch millis,
/// then 3 random digits (e.g. `SHIP482913057`).
pub fn document_number(prefix: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{prefix}{tail}{suffix:03}")
}
