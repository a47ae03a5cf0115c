//! Order and customer statistics
//!
//! Both reports are folds over records already loaded from the store.
//! Breakdown maps list every known status (or type) with a zero count
//! rather than omitting it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::lifecycle::{CustomerStatus, OrderStatus};
use crate::models::{Customer, CustomerType, Order, Priority};

fn zeroed<T: ToString>(keys: &[T]) -> BTreeMap<String, u64> {
    keys.iter().map(|k| (k.to_string(), 0)).collect()
}

fn bump(map: &mut BTreeMap<String, u64>, key: impl ToString) {
    *map.entry(key.to_string()).or_default() += 1;
}

/// Orders created inside a reporting window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStatistics {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub total_orders: u64,
    /// DELIVERED
    pub completed_orders: u64,
    pub in_transit_orders: u64,
    /// Percent of orders delivered, two decimals
    pub completion_rate: Decimal,
    /// Sum over delivered orders only
    pub total_revenue: Decimal,
    pub by_status: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
}

impl OrderStatistics {
    pub fn collect(
        orders: &[Order],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        let mut by_status = zeroed(OrderStatus::ALL);
        let mut by_priority = zeroed(Priority::ALL);
        let mut completed_orders = 0u64;
        let mut in_transit_orders = 0u64;
        let mut total_revenue = Decimal::ZERO;

        for order in orders {
            bump(&mut by_status, order.status);
            bump(&mut by_priority, order.priority);
            match order.status {
                OrderStatus::Delivered => {
                    completed_orders += 1;
                    total_revenue += order.total_amount;
                }
                OrderStatus::InTransit => in_transit_orders += 1,
                _ => {}
            }
        }

        let total_orders = orders.len() as u64;
        let completion_rate = if total_orders == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(completed_orders) * Decimal::ONE_HUNDRED / Decimal::from(total_orders))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        Self {
            from,
            to,
            total_orders,
            completed_orders,
            in_transit_orders,
            completion_rate,
            total_revenue,
            by_status,
            by_priority,
        }
    }
}

/// Customer base overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerStatistics {
    pub total_customers: u64,
    pub active_customers: u64,
    pub inactive_customers: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_status: BTreeMap<String, u64>,
    /// Rounded to the nearest whole point; customers without a rating are skipped
    pub average_credit_rating: Option<i16>,
    pub total_orders: u64,
    pub total_amount: Decimal,
}

impl CustomerStatistics {
    /// `orders` is every order on file; only those of a listed customer count
    pub fn collect(customers: &[Customer], orders: &[Order]) -> Self {
        let mut by_type = zeroed(CustomerType::ALL);
        let mut by_status = zeroed(CustomerStatus::ALL);
        let mut ratings = Vec::new();
        for customer in customers {
            bump(&mut by_type, customer.customer_type);
            bump(&mut by_status, customer.status);
            ratings.extend(customer.credit_rating.map(i64::from));
        }

        let average_credit_rating = (!ratings.is_empty()).then(|| {
            let sum: i64 = ratings.iter().sum();
            (Decimal::from(sum) / Decimal::from(ratings.len() as i64))
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i16()
                .unwrap_or(i16::MAX)
        });

        let ids: FxHashSet<_> = customers.iter().map(|c| c.id).collect();
        let (total_orders, total_amount) = orders
            .iter()
            .filter(|o| ids.contains(&o.customer_id))
            .fold((0u64, Decimal::ZERO), |(n, sum), o| (n + 1, sum + o.total_amount));

        let count = |status: CustomerStatus| {
            customers.iter().filter(|c| c.status == status).count() as u64
        };
        Self {
            total_customers: customers.len() as u64,
            active_customers: count(CustomerStatus::Active),
            inactive_customers: count(CustomerStatus::Inactive),
            by_type,
            by_status,
            average_credit_rating,
            total_orders,
            total_amount,
        }
    }
}
