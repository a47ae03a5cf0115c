//! GPS tracking ingestion
//!
//! Points are append-only. A batch is cleaned up (clamped coordinates,
//! bounded speed, normalised heading), summarised, and scanned for alerts
//! before it is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::EntityId;
use crate::lifecycle::{LifecycleError, ShipmentStatus};
use crate::models::{Shipment, TrackingPoint};

pub const MAX_BATCH_POINTS: usize = 1000;
pub const MAX_SPEED_KMH: f64 = 300.0;
pub const SPEEDING_KMH: f64 = 120.0;
pub const LOW_BATTERY_PCT: f64 = 20.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// One raw reading from a device
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Speeding,
    LowBattery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingAlert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingStatistics {
    pub total_points: usize,
    /// Seconds between the first and last point
    pub time_span_secs: i64,
    pub distance_km: f64,
    pub avg_speed: f64,
    pub max_speed: f64,
}

/// Points, stats and alerts for one accepted batch
#[derive(Debug, Clone)]
pub struct IngestPlan {
    pub points: Vec<TrackingPoint>,
    pub statistics: TrackingStatistics,
    pub alerts: Vec<TrackingAlert>,
}

/// Clamp and normalise one reading
pub fn preprocess(shipment_id: EntityId, update: &LocationUpdate, now: DateTime<Utc>) -> TrackingPoint {
    let speed = update
        .speed
        .filter(|s| s.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, MAX_SPEED_KMH);
    let heading = update
        .heading
        .filter(|h| h.is_finite())
        .map(|h| h.rem_euclid(360.0))
        .unwrap_or(0.0);

    TrackingPoint {
        id: EntityId::new(),
        shipment_id,
        latitude: update.latitude.clamp(-90.0, 90.0),
        longitude: update.longitude.clamp(-180.0, 180.0),
        speed,
        heading,
        altitude: update.altitude,
        battery_level: update.battery_level.map(|b| b.clamp(0.0, 100.0)),
        recorded_at: update.timestamp.unwrap_or(now),
    }
}

/// Great-circle distance in kilometres
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Statistics over points in recording order
pub fn statistics(points: &[TrackingPoint]) -> TrackingStatistics {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return TrackingStatistics::default();
    };

    let distance_km = points
        .windows(2)
        .map(|w| haversine_km((w[0].latitude, w[0].longitude), (w[1].latitude, w[1].longitude)))
        .sum();
    let max_speed = points.iter().map(|p| p.speed).fold(0.0, f64::max);
    let avg_speed = points.iter().map(|p| p.speed).sum::<f64>() / points.len() as f64;

    TrackingStatistics {
        total_points: points.len(),
        time_span_secs: (last.recorded_at - first.recorded_at).num_seconds(),
        distance_km,
        avg_speed,
        max_speed,
    }
}

pub fn detect_alerts(points: &[TrackingPoint]) -> Vec<TrackingAlert> {
    let mut alerts = Vec::new();
    for p in points {
        if p.speed > SPEEDING_KMH {
            alerts.push(TrackingAlert {
                alert_type: AlertType::Speeding,
                severity: AlertSeverity::High,
                message: format!("speed {:.1} km/h exceeds {} km/h", p.speed, SPEEDING_KMH),
                recorded_at: p.recorded_at,
            });
        }
        if let Some(battery) = p.battery_level.filter(|b| *b < LOW_BATTERY_PCT) {
            alerts.push(TrackingAlert {
                alert_type: AlertType::LowBattery,
                severity: AlertSeverity::Medium,
                message: format!("device battery at {battery:.0}%"),
                recorded_at: p.recorded_at,
            });
        }
    }
    alerts
}

/// Validate and prepare a batch for `shipment`
pub fn plan_ingest(
    shipment: &Shipment,
    updates: &[LocationUpdate],
    now: DateTime<Utc>,
) -> Result<IngestPlan, LifecycleError> {
    if updates.is_empty() {
        return Err(LifecycleError::Validation("empty tracking batch".to_string()));
    }
    if updates.len() > MAX_BATCH_POINTS {
        return Err(LifecycleError::BatchTooLarge {
            size: updates.len(),
            limit: MAX_BATCH_POINTS,
        });
    }
    if shipment.status != ShipmentStatus::InTransit {
        return Err(LifecycleError::ShipmentNotInTransit(shipment.id));
    }

    let mut points: Vec<TrackingPoint> = updates
        .iter()
        .map(|u| preprocess(shipment.id, u, now))
        .collect();
    points.sort_by_key(|p| p.recorded_at);

    Ok(IngestPlan {
        statistics: statistics(&points),
        alerts: detect_alerts(&points),
        points,
    })
}
