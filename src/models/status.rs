//! String-backed enums stored in varchar columns.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Persisted name of each [`super::order_state::OrderState`] variant.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum Stage {
    Draft,
    Submitted,
    PartiallyApproved,
    Validated,
    Printed,
    Assigned,
    Delivered,
    CollectionApproved,
}

/// Coarse order status kept for API consumers that predate the state machine.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum OrderStatus {
    Draft,
    Submitted,
    Approved,
    PartiallyApproved,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum CollectionStatus {
    Pending,
    PartiallyCollected,
    Postponed,
    FullyCollected,
}

/// Where the delivery outcome was reported from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum CollectionSource {
    Web,
    MobileApp,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum DeliveryStatus {
    Picked,
    Completed,
    Cancelled,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum TransferStatus {
    Pending,
    InTransit,
    Received,
    Rejected,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum DepositChannel {
    Cash,
    Bank,
    MobileBanking,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum BatchStatus {
    Active,
    Depleted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn stored_names_round_trip() {
        assert_eq!(Stage::CollectionApproved.as_ref(), "CollectionApproved");
        assert_eq!(
            CollectionStatus::from_str("PartiallyCollected").unwrap(),
            CollectionStatus::PartiallyCollected
        );
        assert!(TransferStatus::from_str("Lost").is_err());
    }
}
