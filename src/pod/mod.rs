//! Proof of delivery
//!
//! File validation and storage live in [`files`]; upload and review
//! planning in [`review`].

pub mod files;
pub mod review;

pub use files::{ALLOWED_MIME_TYPES, MAX_FILE_SIZE, PodFileStore, StoredFile};
pub use review::{PodDetails, PodReview, ensure_pod_allowed, plan_pod_review, plan_pod_upload};
