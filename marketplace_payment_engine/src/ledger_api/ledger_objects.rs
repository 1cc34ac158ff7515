use std::fmt::Display;

use chrono::{DateTime, Utc};
use mpg_common::Rupees;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Payment, PaymentStatus, ShipmentStatus, SubOrder};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

//--------------------------------------      Pagination       -------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl Pagination {
    pub fn sql_limit(&self) -> i64 {
        self.count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn sql_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

//--------------------------------------  PaymentQueryFilter   -------------------------------------------------------
/// Filter predicates for payment listings. All predicates are conjunctive; `search` matches the order number and
/// the seller snapshot fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentQueryFilter {
    pub status: Option<PaymentStatus>,
    pub seller_id: Option<i64>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl PaymentQueryFilter {
    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_seller_id(mut self, seller_id: i64) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.seller_id.is_none()
            && self.search.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }

    /// The same filter with the status predicate dropped. Summary aggregates for the admin dashboard are computed
    /// over this, so that totals cover every status while the listing stays filtered.
    pub fn without_status(&self) -> Self {
        Self { status: None, ..self.clone() }
    }
}

impl Display for PaymentQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status={status}"));
        }
        if let Some(seller_id) = self.seller_id {
            parts.push(format!("seller_id={seller_id}"));
        }
        if let Some(search) = &self.search {
            parts.push(format!("search={search}"));
        }
        if let Some(since) = self.since {
            parts.push(format!("since={since}"));
        }
        if let Some(until) = self.until {
            parts.push(format!("until={until}"));
        }
        if parts.is_empty() {
            write!(f, "(no filter)")
        } else {
            write!(f, "{}", parts.join(","))
        }
    }
}

//--------------------------------------    PaymentSummary     -------------------------------------------------------
/// Aggregate figures over a payment filter: status counts and amount totals, all computed in one pass by the
/// backend.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_count: i64,
    pub escrow_count: i64,
    pub released_count: i64,
    pub escrow_total: Rupees,
    pub released_total: Rupees,
    pub commission_total: Rupees,
    pub released_commission_total: Rupees,
}

//--------------------------------------    PaymentListing     -------------------------------------------------------
/// A page of payments plus the aggregate summary, as returned to the dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentListing {
    pub payments: Vec<Payment>,
    pub summary: PaymentSummary,
    pub offset: i64,
    pub count: i64,
}

//--------------------------------------    DeliveryOutcome    -------------------------------------------------------
/// The result of a delivery confirmation.
///
/// Confirming delivery is a two-phase operation: the sub-order status change is committed first, then the escrow
/// release is attempted best-effort. When the second phase fails the sub-order is still delivered, and the gap is
/// reported explicitly rather than smuggled through an optional error string.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome")]
pub enum DeliveryOutcome {
    /// Delivery recorded and the escrow payment is released.
    Delivered { sub_order: SubOrder, payment: Payment },
    /// Delivery recorded but the escrow release did not go through; reconciliation is pending.
    DeliveredReleasePending { sub_order: SubOrder, release_error: String },
}

impl DeliveryOutcome {
    pub fn release_error(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::DeliveredReleasePending { release_error, .. } => Some(release_error),
        }
    }
}

//--------------------------------------    WebhookOutcome     -------------------------------------------------------
/// What a courier webhook call ended up doing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome")]
pub enum WebhookOutcome {
    TrackingApplied { sub_order: SubOrder, shipment_status: ShipmentStatus },
    ShipmentRecorded { sub_order: SubOrder },
}
