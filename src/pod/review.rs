//! POD upload and review planning

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::files::StoredFile;
use crate::core_types::{EntityId, document_number, prefix};
use crate::lifecycle::effects::close_direct_shipments;
use crate::lifecycle::transition::{Transition, check_transition};
use crate::lifecycle::{LifecycleError, OrderStatus, PodStatus, ShipmentStatus, WriteIntent};
use crate::models::{Order, OrderPatch, PaymentStatus, Pod, PodPatch, Shipment};

/// A POD older than this fails verification
pub const MAX_POD_AGE_DAYS: i64 = 7;

/// Receiver-side details captured with the upload
#[derive(Debug, Clone, Default)]
pub struct PodDetails {
    pub receiver_name: Option<String>,
    pub receiver_signature: Option<String>,
    pub delivery_photo: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Review command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PodReview {
    Verify {
        verified_by: String,
        #[serde(default)]
        signature_waived: bool,
        #[serde(default)]
        photo_waived: bool,
    },
    Reject {
        rejected_by: String,
        reason: String,
    },
}

impl PodReview {
    pub fn reviewer(&self) -> &str {
        match self {
            PodReview::Verify { verified_by, .. } => verified_by,
            PodReview::Reject { rejected_by, .. } => rejected_by,
        }
    }
}

/// Why a POD would not verify; empty means it passes
pub fn verification_issues(
    pod: &Pod,
    order: &Order,
    signature_waived: bool,
    photo_waived: bool,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut issues = Vec::new();
    let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());

    if !signature_waived && blank(&pod.receiver_signature) {
        issues.push("missing receiver signature".to_string());
    }
    if !photo_waived && blank(&pod.delivery_photo) {
        issues.push("missing delivery photo".to_string());
    }
    if now - pod.delivery_time > Duration::days(MAX_POD_AGE_DAYS) {
        issues.push(format!(
            "delivery was more than {MAX_POD_AGE_DAYS} days ago"
        ));
    }
    if order.status != OrderStatus::Delivered {
        issues.push(format!("order is {} rather than DELIVERED", order.status));
    }
    issues
}

/// Only orders on the road or already delivered accept a POD
pub fn ensure_pod_allowed(order: &Order) -> Result<(), LifecycleError> {
    if matches!(order.status, OrderStatus::InTransit | OrderStatus::Delivered) {
        Ok(())
    } else {
        Err(LifecycleError::PodNotAllowed {
            order_id: order.id,
            status: order.status,
        })
    }
}

/// Plan a new POD for `order`. The order moves to DELIVERED if it is not
/// there yet, which also completes its direct shipment and frees the
/// vehicle. `shipments` are the order's shipments.
pub fn plan_pod_upload(
    order: &Order,
    shipments: &[Shipment],
    file: StoredFile,
    details: PodDetails,
    actor: Option<String>,
    now: DateTime<Utc>,
) -> Result<(Pod, Vec<WriteIntent>), LifecycleError> {
    ensure_pod_allowed(order)?;

    let delivery_time = details.delivery_time.unwrap_or(now);
    let pod = Pod {
        id: EntityId::new(),
        pod_number: document_number(prefix::POD, now),
        order_id: order.id,
        status: PodStatus::Uploaded,
        file_name: file.file_name,
        original_name: file.original_name,
        file_path: file.file_path,
        file_url: file.file_url,
        file_size: file.file_size,
        mime_type: file.mime_type,
        checksum: file.checksum,
        receiver_name: details.receiver_name,
        receiver_signature: details.receiver_signature,
        delivery_photo: details.delivery_photo,
        delivery_time,
        notes: details.notes,
        uploaded_by: actor.clone(),
        verified_by: None,
        verified_at: None,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    };

    let mut intents = vec![WriteIntent::CreatePod(pod.clone())];
    if let Transition::Apply { from, to } = check_transition(order.status, OrderStatus::Delivered)? {
        intents.extend(close_direct_shipments(shipments, ShipmentStatus::Completed));
        intents.push(WriteIntent::UpdateOrder {
            id: order.id,
            expected: Some(from),
            patch: OrderPatch {
                status: Some(to),
                delivery_time: Some(delivery_time),
                updated_by: actor,
                ..Default::default()
            },
        });
    }
    Ok((pod, intents))
}

/// Plan a review. Verification that finds issues rejects the POD instead.
pub fn plan_pod_review(
    pod: &Pod,
    order: &Order,
    review: &PodReview,
    now: DateTime<Utc>,
) -> Result<Vec<WriteIntent>, LifecycleError> {
    if review.reviewer().trim().is_empty() {
        return Err(LifecycleError::Validation("reviewer is required".to_string()));
    }

    let (target, rejection_reason) = match review {
        PodReview::Verify {
            signature_waived,
            photo_waived,
            ..
        } => {
            let issues = verification_issues(pod, order, *signature_waived, *photo_waived, now);
            if issues.is_empty() {
                (PodStatus::Verified, None)
            } else {
                (PodStatus::Rejected, Some(issues.join("; ")))
            }
        }
        PodReview::Reject { reason, .. } => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(LifecycleError::Validation(
                    "a rejection reason is required".to_string(),
                ));
            }
            (PodStatus::Rejected, Some(reason.to_string()))
        }
    };

    let Transition::Apply { from, to } = check_transition(pod.status, target)? else {
        return Ok(Vec::new());
    };

    let mut intents = vec![WriteIntent::UpdatePod {
        id: pod.id,
        expected: Some(from),
        patch: PodPatch {
            status: Some(to),
            verified_by: Some(review.reviewer().to_string()),
            verified_at: Some(now),
            rejection_reason,
        },
    }];
    if to == PodStatus::Verified {
        intents.push(WriteIntent::UpdateOrder {
            id: order.id,
            expected: None,
            patch: OrderPatch {
                payment_status: Some(PaymentStatus::Paid),
                updated_by: Some(review.reviewer().to_string()),
                ..Default::default()
            },
        });
    }
    Ok(intents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::VehicleStatus;
    use crate::models::fixtures;

    fn stored_file() -> StoredFile {
        StoredFile {
            file_name: "1700000000000_abc123.png".into(),
            original_name: "receipt.png".into(),
            file_path: "/tmp/pods/x/1700000000000_abc123.png".into(),
            file_url: "/api/tms/pod/files/x/1700000000000_abc123.png".into(),
            file_size: 5,
            mime_type: "image/png".into(),
            checksum: "5d41402abc4b2a76b9719d911017c592".into(),
        }
    }

    fn complete_details() -> PodDetails {
        PodDetails {
            receiver_name: Some("R. Receiver".into()),
            receiver_signature: Some("sig-data".into()),
            delivery_photo: Some("photo-ref".into()),
            ..Default::default()
        }
    }

    fn uploaded(order: &Order, details: PodDetails) -> Pod {
        plan_pod_upload(order, &[], stored_file(), details, None, Utc::now())
            .unwrap()
            .0
    }

    #[test]
    fn test_upload_delivers_in_transit_order() {
        let order = fixtures::order(OrderStatus::InTransit);
        let now = Utc::now();
        let (pod, intents) =
            plan_pod_upload(&order, &[], stored_file(), complete_details(), Some("driver-1".into()), now)
                .unwrap();

        assert_eq!(pod.status, PodStatus::Uploaded);
        assert!(pod.pod_number.starts_with("POD"));
        assert_eq!(pod.checksum, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(intents.len(), 2);
        assert!(matches!(
            &intents[1],
            WriteIntent::UpdateOrder { expected: Some(OrderStatus::InTransit), patch, .. }
                if patch.status == Some(OrderStatus::Delivered) && patch.delivery_time == Some(now)
        ));
    }

    #[test]
    fn test_upload_completes_direct_shipment_and_frees_vehicle() {
        let order = fixtures::order(OrderStatus::InTransit);
        let vehicle = fixtures::vehicle(VehicleStatus::InTransit);
        let now = Utc::now();
        let shipment = Shipment::scheduled(
            order.id,
            None,
            vehicle.id,
            None,
            1,
            now,
            chrono::Duration::hours(24),
            now,
        );

        let (_, intents) = plan_pod_upload(
            &order,
            std::slice::from_ref(&shipment),
            stored_file(),
            complete_details(),
            None,
            now,
        )
        .unwrap();
        assert_eq!(intents.len(), 4);
        assert!(matches!(
            &intents[1],
            WriteIntent::UpdateShipment { id, patch, .. }
                if *id == shipment.id && patch.status == Some(ShipmentStatus::Completed)
        ));
        assert!(matches!(
            &intents[2],
            WriteIntent::UpdateVehicle { id, patch, .. }
                if *id == vehicle.id && patch.status == Some(VehicleStatus::Available)
        ));
        assert!(matches!(&intents[3], WriteIntent::UpdateOrder { .. }));
    }

    #[test]
    fn test_upload_on_delivered_order_keeps_status() {
        let order = fixtures::order(OrderStatus::Delivered);
        let (_, intents) =
            plan_pod_upload(&order, &[], stored_file(), complete_details(), None, Utc::now()).unwrap();
        assert_eq!(intents.len(), 1);
        assert!(matches!(intents[0], WriteIntent::CreatePod(_)));
    }

    #[test]
    fn test_upload_requires_shipped_order() {
        for status in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Cancelled] {
            let order = fixtures::order(status);
            let err = plan_pod_upload(&order, &[], stored_file(), complete_details(), None, Utc::now())
                .unwrap_err();
            assert!(matches!(err, LifecycleError::PodNotAllowed { .. }));
        }
    }

    #[test]
    fn test_verify_marks_order_paid() {
        let order = fixtures::order(OrderStatus::Delivered);
        let pod = uploaded(&order, complete_details());
        let review = PodReview::Verify {
            verified_by: "auditor".into(),
            signature_waived: false,
            photo_waived: false,
        };

        let intents = plan_pod_review(&pod, &order, &review, Utc::now()).unwrap();
        assert_eq!(intents.len(), 2);
        assert!(matches!(
            &intents[0],
            WriteIntent::UpdatePod { patch, .. } if patch.status == Some(PodStatus::Verified)
        ));
        assert!(matches!(
            &intents[1],
            WriteIntent::UpdateOrder { patch, .. } if patch.payment_status == Some(PaymentStatus::Paid)
        ));
    }

    #[test]
    fn test_verify_with_issues_rejects() {
        let order = fixtures::order(OrderStatus::Delivered);
        let pod = uploaded(&order, PodDetails::default());
        let review = PodReview::Verify {
            verified_by: "auditor".into(),
            signature_waived: false,
            photo_waived: false,
        };

        let intents = plan_pod_review(&pod, &order, &review, Utc::now()).unwrap();
        assert_eq!(intents.len(), 1);
        match &intents[0] {
            WriteIntent::UpdatePod { patch, .. } => {
                assert_eq!(patch.status, Some(PodStatus::Rejected));
                let reason = patch.rejection_reason.as_deref().unwrap();
                assert!(reason.contains("signature"));
                assert!(reason.contains("photo"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_waivers_allow_verification() {
        let order = fixtures::order(OrderStatus::Delivered);
        let pod = uploaded(&order, PodDetails::default());
        let review = PodReview::Verify {
            verified_by: "auditor".into(),
            signature_waived: true,
            photo_waived: true,
        };
        let intents = plan_pod_review(&pod, &order, &review, Utc::now()).unwrap();
        assert!(matches!(
            &intents[0],
            WriteIntent::UpdatePod { patch, .. } if patch.status == Some(PodStatus::Verified)
        ));
    }

    #[test]
    fn test_stale_delivery_is_an_issue() {
        let order = fixtures::order(OrderStatus::Delivered);
        let mut pod = uploaded(&order, complete_details());
        let now = Utc::now();
        pod.delivery_time = now - Duration::days(8);
        let issues = verification_issues(&pod, &order, false, false, now);
        assert_eq!(issues, vec!["delivery was more than 7 days ago".to_string()]);
    }

    #[test]
    fn test_explicit_reject_needs_reason() {
        let order = fixtures::order(OrderStatus::Delivered);
        let pod = uploaded(&order, complete_details());
        let review = PodReview::Reject {
            rejected_by: "auditor".into(),
            reason: " ".into(),
        };
        assert!(matches!(
            plan_pod_review(&pod, &order, &review, Utc::now()),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn test_reviewed_pod_is_final() {
        let order = fixtures::order(OrderStatus::Delivered);
        let mut pod = uploaded(&order, complete_details());
        pod.status = PodStatus::Rejected;
        let review = PodReview::Verify {
            verified_by: "auditor".into(),
            signature_waived: false,
            photo_waived: false,
        };
        assert!(matches!(
            plan_pod_review(&pod, &order, &review, Utc::now()),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_review_command_wire_format() {
        let review: PodReview = serde_json::from_str(
            r#"{"action":"VERIFY","verified_by":"qa","signature_waived":true}"#,
        )
        .unwrap();
        assert_eq!(
            review,
            PodReview::Verify {
                verified_by: "qa".into(),
                signature_waived: true,
                photo_waived: false,
            }
        );
        let review: PodReview =
            serde_json::from_str(r#"{"action":"REJECT","rejected_by":"qa","reason":"blurry"}"#)
                .unwrap();
        assert_eq!(review.reviewer(), "qa");
    }
}
