use std::fmt::Display;

use chrono::{DateTime, Utc};
use marketplace_payment_engine::{
    db_types::PaymentStatus,
    ledger_api::{Pagination, PaymentQueryFilter},
};
use serde::{Deserialize, Serialize};

/// Query string for the payment listing routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentsQuery {
    pub status: Option<PaymentStatus>,
    pub search: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl PaymentsQuery {
    pub fn filter(&self) -> PaymentQueryFilter {
        PaymentQueryFilter {
            status: self.status,
            seller_id: None,
            search: self.search.clone(),
            since: self.since,
            until: self.until,
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination { offset: self.offset, count: self.count }
    }
}

/// An admin action against a single payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAction {
    Release,
    Refund,
    Dispute,
    MarkManualPaid,
}

impl Display for PaymentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentAction::Release => write!(f, "release"),
            PaymentAction::Refund => write!(f, "refund"),
            PaymentAction::Dispute => write!(f, "dispute"),
            PaymentAction::MarkManualPaid => write!(f, "mark_manual_paid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentActionRequest {
    pub sub_order_id: i64,
    pub action: PaymentAction,
    pub note: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn payment_actions_use_snake_case_on_the_wire() {
        let req: PaymentActionRequest =
            serde_json::from_str(r#"{"sub_order_id": 5, "action": "mark_manual_paid"}"#).unwrap();
        assert_eq!(req.action, PaymentAction::MarkManualPaid);
        assert!(req.note.is_none());
    }
}
