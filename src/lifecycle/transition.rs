//! Status Transition Validator
//!
//! Static adjacency tables for the entities with a real lifecycle
//! (Order, Dispatch, POD, Customer). Everything here is pure.
//!
//! ```text
//! Order:    PENDING → CONFIRMED → IN_TRANSIT → DELIVERED
//!              ↓          ↓           ↓   ↑
//!          CANCELLED  CANCELLED    RETURNED
//!
//! Dispatch: SCHEDULED → DEPARTED → IN_TRANSIT → ARRIVED → COMPLETED
//!              │  └──────────────────↗   │
//!              └───────→ CANCELLED ←─────┘   (from any pre-arrival state)
//!
//! POD:      UPLOADED → VERIFIED | REJECTED
//!
//! Customer: ACTIVE ⇄ INACTIVE, ACTIVE ⇄ SUSPENDED → BLACKLISTED → ACTIVE
//! ```

use std::fmt;

use super::error::LifecycleError;
use super::state::{
    CustomerStatus, DispatchStatus, EntityKind, OrderStatus, PodStatus, UnknownStatus,
};

/// A status enum with a fixed transition table.
pub trait StatusMachine: Copy + Eq + fmt::Display + 'static {
    const KIND: EntityKind;

    /// Statuses reachable in one step
    fn allowed_next(self) -> &'static [Self];

    #[inline]
    fn can_transition_to(self, to: Self) -> bool {
        self.allowed_next().contains(&to)
    }

    #[inline]
    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl StatusMachine for OrderStatus {
    const KIND: EntityKind = EntityKind::Order;

    fn allowed_next(self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[InTransit, Cancelled],
            InTransit => &[Delivered, Returned],
            Delivered | Cancelled => &[],
            Returned => &[InTransit],
        }
    }
}

impl StatusMachine for DispatchStatus {
    const KIND: EntityKind = EntityKind::Dispatch;

    fn allowed_next(self) -> &'static [Self] {
        use DispatchStatus::*;
        match self {
            Scheduled => &[Departed, InTransit, Cancelled],
            Departed => &[InTransit, Arrived, Cancelled],
            InTransit => &[Arrived, Cancelled],
            Arrived => &[Completed],
            Completed | Cancelled => &[],
        }
    }
}

impl StatusMachine for PodStatus {
    const KIND: EntityKind = EntityKind::Pod;

    fn allowed_next(self) -> &'static [Self] {
        match self {
            PodStatus::Uploaded => &[PodStatus::Verified, PodStatus::Rejected],
            PodStatus::Verified | PodStatus::Rejected => &[],
        }
    }
}

impl StatusMachine for CustomerStatus {
    const KIND: EntityKind = EntityKind::Customer;

    fn allowed_next(self) -> &'static [Self] {
        use CustomerStatus::*;
        match self {
            Active => &[Inactive, Suspended, Blacklisted],
            Inactive => &[Active],
            Suspended => &[Active, Blacklisted],
            Blacklisted => &[Active],
        }
    }
}

/// Outcome of a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Status moves; side effects apply
    Apply { from: S, to: S },
    /// Requested status equals the current one; nothing to write
    Unchanged(S),
}

impl<S: Copy> Transition<S> {
    pub fn target(&self) -> S {
        match *self {
            Transition::Apply { to, .. } => to,
            Transition::Unchanged(s) => s,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Transition::Apply { .. })
    }
}

/// Validate `from -> to` against the table of `S`.
///
/// Requesting the current status is accepted as a no-op, including for
/// terminal statuses.
pub fn check_transition<S: StatusMachine>(from: S, to: S) -> Result<Transition<S>, LifecycleError> {
    if from == to {
        return Ok(Transition::Unchanged(from));
    }
    if from.can_transition_to(to) {
        Ok(Transition::Apply { from, to })
    } else {
        Err(LifecycleError::InvalidTransition {
            kind: S::KIND,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// A status change tagged with its entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Order { from: OrderStatus, to: OrderStatus },
    Dispatch { from: DispatchStatus, to: DispatchStatus },
    Pod { from: PodStatus, to: PodStatus },
}

impl StatusChange {
    /// Parse raw status names for `kind`. Kinds without a lifecycle table are rejected.
    pub fn parse(kind: EntityKind, from: &str, to: &str) -> Result<Self, LifecycleError> {
        fn both<S: std::str::FromStr<Err = UnknownStatus>>(
            from: &str,
            to: &str,
        ) -> Result<(S, S), LifecycleError> {
            let from = from
                .parse::<S>()
                .map_err(|e| LifecycleError::Validation(e.to_string()))?;
            let to = to
                .parse::<S>()
                .map_err(|e| LifecycleError::Validation(e.to_string()))?;
            Ok((from, to))
        }

        match kind {
            EntityKind::Order => both(from, to).map(|(from, to)| StatusChange::Order { from, to }),
            EntityKind::Dispatch => {
                both(from, to).map(|(from, to)| StatusChange::Dispatch { from, to })
            }
            EntityKind::Pod => both(from, to).map(|(from, to)| StatusChange::Pod { from, to }),
            other => Err(LifecycleError::Validation(format!(
                "{other} has no status lifecycle"
            ))),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            StatusChange::Order { .. } => EntityKind::Order,
            StatusChange::Dispatch { .. } => EntityKind::Dispatch,
            StatusChange::Pod { .. } => EntityKind::Pod,
        }
    }

    /// Run the table check; `Ok(true)` when the status actually moves
    pub fn validate(&self) -> Result<bool, LifecycleError> {
        match *self {
            StatusChange::Order { from, to } => check_transition(from, to).map(|t| t.is_change()),
            StatusChange::Dispatch { from, to } => {
                check_transition(from, to).map(|t| t.is_change())
            }
            StatusChange::Pod { from, to } => check_transition(from, to).map(|t| t.is_change()),
        }
    }
}

/// Wire names of the statuses reachable from `current`
pub fn next_status_names<S: StatusMachine>(current: S) -> Vec<String> {
    current
        .allowed_next()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_table<S: StatusMachine + fmt::Debug>(all: &[S], allowed: &[(S, S)]) {
        for &from in all {
            for &to in all {
                let result = check_transition(from, to);
                if from == to {
                    assert_eq!(result.unwrap(), Transition::Unchanged(from));
                } else if allowed.contains(&(from, to)) {
                    assert_eq!(result.unwrap(), Transition::Apply { from, to });
                } else {
                    match result {
                        Err(LifecycleError::InvalidTransition { kind, .. }) => {
                            assert_eq!(kind, S::KIND)
                        }
                        other => panic!("{from:?} -> {to:?} should be rejected, got {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_order_table_is_exact() {
        use OrderStatus::*;
        assert_table(
            OrderStatus::ALL,
            &[
                (Pending, Confirmed),
                (Pending, Cancelled),
                (Confirmed, InTransit),
                (Confirmed, Cancelled),
                (InTransit, Delivered),
                (InTransit, Returned),
                (Returned, InTransit),
            ],
        );
    }

    #[test]
    fn test_dispatch_table_is_exact() {
        use DispatchStatus::*;
        assert_table(
            DispatchStatus::ALL,
            &[
                (Scheduled, Departed),
                (Scheduled, InTransit),
                (Scheduled, Cancelled),
                (Departed, InTransit),
                (Departed, Arrived),
                (Departed, Cancelled),
                (InTransit, Arrived),
                (InTransit, Cancelled),
                (Arrived, Completed),
            ],
        );
    }

    #[test]
    fn test_pod_table_is_exact() {
        use PodStatus::*;
        assert_table(PodStatus::ALL, &[(Uploaded, Verified), (Uploaded, Rejected)]);
    }

    #[test]
    fn test_customer_table_is_exact() {
        use CustomerStatus::*;
        assert_table(
            CustomerStatus::ALL,
            &[
                (Active, Inactive),
                (Active, Suspended),
                (Active, Blacklisted),
                (Inactive, Active),
                (Suspended, Active),
                (Suspended, Blacklisted),
                (Blacklisted, Active),
            ],
        );
        assert!(!Blacklisted.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Returned.is_terminal());
        assert!(DispatchStatus::Completed.is_terminal());
        assert!(DispatchStatus::Cancelled.is_terminal());
        assert!(PodStatus::Verified.is_terminal());
    }

    #[test]
    fn test_pending_cannot_jump_to_delivered() {
        let err = check_transition(OrderStatus::Pending, OrderStatus::Delivered).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Order status transition: PENDING -> DELIVERED"
        );
    }

    #[test]
    fn test_status_change_parse_and_validate() {
        let change = StatusChange::parse(EntityKind::Order, "CONFIRMED", "IN_TRANSIT").unwrap();
        assert_eq!(change.kind(), EntityKind::Order);
        assert!(change.validate().unwrap());

        let same = StatusChange::parse(EntityKind::Pod, "VERIFIED", "VERIFIED").unwrap();
        assert!(!same.validate().unwrap());

        let bad = StatusChange::parse(EntityKind::Dispatch, "COMPLETED", "SCHEDULED").unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_status_change_rejects_unknown_names_and_kinds() {
        assert!(matches!(
            StatusChange::parse(EntityKind::Order, "PENDING", "LOST"),
            Err(LifecycleError::Validation(_))
        ));
        assert!(matches!(
            StatusChange::parse(EntityKind::Vehicle, "AVAILABLE", "IN_TRANSIT"),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn test_next_status_names() {
        assert_eq!(
            next_status_names(OrderStatus::Pending),
            vec!["CONFIRMED".to_string(), "CANCELLED".to_string()]
        );
        assert!(next_status_names(DispatchStatus::Completed).is_empty());
    }
}
