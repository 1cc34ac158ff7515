//! Data types for the settlement ledger.
//!
//! These map 1:1 onto the database schema and are shared by the backend trait implementations and the public APIs.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mpg_common::Rupees;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The customer-facing order number, e.g. `ORD-2024-000123`.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The aggregate delivery status of a customer order, recomputed from its sub-orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// At least one sub-order is still being fulfilled.
    Processing,
    /// Some, but not all, sub-orders have been shipped or delivered.
    PartiallyDelivered,
    /// Every sub-order has been delivered.
    Delivered,
    /// The order was cancelled.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::PartiallyDelivered => write!(f, "PartiallyDelivered"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "PartiallyDelivered" => Ok(Self::PartiallyDelivered),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentState      -------------------------------------------------------
/// Whether the customer's payment for the whole order has been captured by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentState {
    Pending,
    Captured,
    Refunded,
}

impl Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentState::Pending => write!(f, "Pending"),
            PaymentState::Captured => write!(f, "Captured"),
            PaymentState::Refunded => write!(f, "Refunded"),
        }
    }
}

//--------------------------------------    SubOrderStatus     -------------------------------------------------------
/// Fulfilment status of a single seller's portion of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SubOrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl Display for SubOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubOrderStatus::Pending => write!(f, "Pending"),
            SubOrderStatus::Confirmed => write!(f, "Confirmed"),
            SubOrderStatus::Shipped => write!(f, "Shipped"),
            SubOrderStatus::Delivered => write!(f, "Delivered"),
            SubOrderStatus::Cancelled => write!(f, "Cancelled"),
            SubOrderStatus::Returned => write!(f, "Returned"),
        }
    }
}

impl FromStr for SubOrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Returned" => Ok(Self::Returned),
            s => Err(ConversionError(format!("Invalid sub-order status: {s}"))),
        }
    }
}

//--------------------------------------    ShipmentStatus     -------------------------------------------------------
/// Internal shipment status vocabulary. Courier status strings are mapped onto this enumeration by
/// [`crate::courier::map_courier_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ShipmentStatus {
    PendingPickup,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    FailedDelivery,
    Returned,
}

impl Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShipmentStatus::PendingPickup => write!(f, "PendingPickup"),
            ShipmentStatus::PickedUp => write!(f, "PickedUp"),
            ShipmentStatus::InTransit => write!(f, "InTransit"),
            ShipmentStatus::OutForDelivery => write!(f, "OutForDelivery"),
            ShipmentStatus::Delivered => write!(f, "Delivered"),
            ShipmentStatus::FailedDelivery => write!(f, "FailedDelivery"),
            ShipmentStatus::Returned => write!(f, "Returned"),
        }
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// Status of an escrow ledger entry.
///
/// The intended lifecycle is one-directional: `Escrow` (optionally via `AdminApproval`) to exactly one of the
/// terminal states. The storage layer does not enforce a state machine; the flow API refuses the transitions that
/// must never happen (see [`crate::traits::PaymentLedgerDatabase::transition_payment`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Funds are held by the platform, pending delivery confirmation.
    Escrow,
    /// Funds are held and the entry is flagged for admin review before release.
    AdminApproval,
    /// Funds have been released to the seller.
    Released,
    /// Funds were returned to the buyer.
    Refunded,
    /// The sub-order was cancelled before release.
    Cancelled,
    /// The entry is frozen pending dispute resolution.
    Disputed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Escrow => write!(f, "Escrow"),
            PaymentStatus::AdminApproval => write!(f, "AdminApproval"),
            PaymentStatus::Released => write!(f, "Released"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
            PaymentStatus::Cancelled => write!(f, "Cancelled"),
            PaymentStatus::Disputed => write!(f, "Disputed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Escrow" => Ok(Self::Escrow),
            "AdminApproval" => Ok(Self::AdminApproval),
            "Released" => Ok(Self::Released),
            "Refunded" => Ok(Self::Refunded),
            "Cancelled" => Ok(Self::Cancelled),
            "Disputed" => Ok(Self::Disputed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl PaymentStatus {
    /// True while the funds are still held by the platform.
    pub fn is_held(&self) -> bool {
        matches!(self, PaymentStatus::Escrow | PaymentStatus::AdminApproval)
    }
}

//--------------------------------------      PayoutMode       -------------------------------------------------------
/// How the seller gets paid for this sub-order. `Manual` entries are settled outside the escrow release flow and
/// tracked via `manual_status`/`manual_history` on the same payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PayoutMode {
    Escrow,
    Manual,
}

impl Display for PayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutMode::Escrow => write!(f, "Escrow"),
            PayoutMode::Manual => write!(f, "Manual"),
        }
    }
}

//--------------------------------------  ManualPayoutStatus   -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ManualPayoutStatus {
    Pending,
    Processing,
    Paid,
}

impl Display for ManualPayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManualPayoutStatus::Pending => write!(f, "Pending"),
            ManualPayoutStatus::Processing => write!(f, "Processing"),
            ManualPayoutStatus::Paid => write!(f, "Paid"),
        }
    }
}

impl ManualPayoutStatus {
    /// The next step in the manual payout progression, or `None` once paid.
    pub fn next(&self) -> Option<ManualPayoutStatus> {
        match self {
            ManualPayoutStatus::Pending => Some(ManualPayoutStatus::Processing),
            ManualPayoutStatus::Processing => Some(ManualPayoutStatus::Paid),
            ManualPayoutStatus::Paid => None,
        }
    }
}

//--------------------------------------       ActorType       -------------------------------------------------------
/// Who performed a ledger action. Recorded in every history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Seller,
    Admin,
    Courier,
    System,
}

impl Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorType::Seller => write!(f, "seller"),
            ActorType::Admin => write!(f, "admin"),
            ActorType::Courier => write!(f, "courier"),
            ActorType::System => write!(f, "system"),
        }
    }
}

/// An (actor type, actor id) pair identifying who triggered a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub actor_type: ActorType,
    pub actor_id: Option<String>,
}

impl ActorRef {
    pub fn seller(id: i64) -> Self {
        Self { actor_type: ActorType::Seller, actor_id: Some(id.to_string()) }
    }

    pub fn admin(id: i64) -> Self {
        Self { actor_type: ActorType::Admin, actor_id: Some(id.to_string()) }
    }

    pub fn system() -> Self {
        Self { actor_type: ActorType::System, actor_id: None }
    }
}

impl Display for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.actor_id {
            Some(id) => write!(f, "{}:{id}", self.actor_type),
            None => write!(f, "{}", self.actor_type),
        }
    }
}

//--------------------------------------  PaymentHistoryEntry  -------------------------------------------------------
/// One entry in a payment's append-only history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    pub status: String,
    pub note: Option<String>,
    pub actor_type: ActorType,
    pub actor_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PaymentHistoryEntry {
    pub fn new<S: Display>(status: S, actor: &ActorRef, note: Option<String>) -> Self {
        Self {
            status: status.to_string(),
            note,
            actor_type: actor.actor_type,
            actor_id: actor.actor_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

//--------------------------------------        Seller         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seller {
    pub id: i64,
    pub business_name: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seller {
    /// Resolves the display name recorded on payment snapshots: the business name if present, else the
    /// profile name, else the first and last names concatenated.
    pub fn snapshot(&self) -> SellerSnapshot {
        let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        let name = non_empty(&self.business_name).or_else(|| non_empty(&self.name)).unwrap_or_else(|| {
            let first = non_empty(&self.first_name).unwrap_or_default();
            let last = non_empty(&self.last_name).unwrap_or_default();
            format!("{first} {last}").trim().to_string()
        });
        SellerSnapshot { name, email: self.email.clone() }
    }
}

/// The seller's name and email as they were at the time the payment record was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSnapshot {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewSeller {
    pub business_name: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub payment_status: PaymentState,
    pub status: OrderStatusType,
    pub total_amount: Rupees,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub payment_status: PaymentState,
    pub total_amount: Rupees,
}

impl NewOrder {
    pub fn new(order_number: OrderId, customer_name: String, customer_email: String, total_amount: Rupees) -> Self {
        Self { order_number, customer_name, customer_email, payment_status: PaymentState::Captured, total_amount }
    }
}

//--------------------------------------       SubOrder        -------------------------------------------------------
/// One seller's portion of an order, with the shipment package embedded.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubOrder {
    pub id: i64,
    pub order_id: i64,
    pub seller_id: i64,
    pub amount: Rupees,
    pub status: SubOrderStatus,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub courier: Option<String>,
    pub current_location: Option<String>,
    pub shipment_status: Option<ShipmentStatus>,
    pub delivery_attempts: i64,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubOrder {
    pub order_id: i64,
    pub seller_id: i64,
    pub amount: Rupees,
}

//--------------------------------------        Payment        -------------------------------------------------------
/// One escrow ledger entry per sub-order. `sub_order_id` carries a UNIQUE index; that index, not a transaction, is
/// what prevents duplicates under concurrent creation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub sub_order_id: i64,
    pub order_number: OrderId,
    pub seller_id: i64,
    pub seller_name: String,
    pub seller_email: String,
    pub total_amount: Rupees,
    pub commission_rate: f64,
    pub commission_amount: Rupees,
    pub seller_amount: Rupees,
    pub status: PaymentStatus,
    pub payout_mode: PayoutMode,
    pub manual_status: Option<ManualPayoutStatus>,
    pub escrow_activated_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub history: Json<Vec<PaymentHistoryEntry>>,
    pub manual_history: Json<Vec<PaymentHistoryEntry>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn seller(business: Option<&str>, name: Option<&str>, first: Option<&str>, last: Option<&str>) -> Seller {
        Seller {
            id: 1,
            business_name: business.map(String::from),
            name: name.map(String::from),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            email: "seller@example.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_prefers_business_name() {
        let s = seller(Some("Acme Exports"), Some("Asha"), Some("Asha"), Some("Iyer"));
        assert_eq!(s.snapshot().name, "Acme Exports");
    }

    #[test]
    fn snapshot_falls_back_to_profile_name_then_first_last() {
        let s = seller(None, Some("Asha"), None, None);
        assert_eq!(s.snapshot().name, "Asha");
        let s = seller(Some("   "), None, Some("Asha"), Some("Iyer"));
        assert_eq!(s.snapshot().name, "Asha Iyer");
        let s = seller(None, None, Some("Asha"), None);
        assert_eq!(s.snapshot().name, "Asha");
    }

    #[test]
    fn manual_payout_progression() {
        assert_eq!(ManualPayoutStatus::Pending.next(), Some(ManualPayoutStatus::Processing));
        assert_eq!(ManualPayoutStatus::Processing.next(), Some(ManualPayoutStatus::Paid));
        assert_eq!(ManualPayoutStatus::Paid.next(), None);
    }
}
