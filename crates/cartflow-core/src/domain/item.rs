//! Cart item model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::ItemId;

/// Reservation progress of a cart item.
///
/// State transitions (driven only by the reservation worker):
/// - Pending -> Available -> Reserved
/// - Pending -> Unavailable
/// - Pending | Available -> Failed (provider error)
///
/// `AvailabilityCheck` is part of the vocabulary shared with other stores but
/// the worker never writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    AvailabilityCheck,
    Available,
    Unavailable,
    Reserved,
    Failed,
}

impl ItemStatus {
    /// Whether the item may still be shown as "potentially available".
    pub fn is_potentially_available(self) -> bool {
        matches!(
            self,
            ItemStatus::Pending | ItemStatus::AvailabilityCheck | ItemStatus::Available
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::AvailabilityCheck => "AVAILABILITY_CHECK",
            ItemStatus::Available => "AVAILABLE",
            ItemStatus::Unavailable => "UNAVAILABLE",
            ItemStatus::Reserved => "RESERVED",
            ItemStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cart line as persisted by the item store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_potentially_available(&self) -> bool {
        self.status.is_potentially_available()
    }
}

/// Input for `ItemStore::create_item`. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub quantity: u32,
    pub status: ItemStatus,
}

impl NewItem {
    /// A freshly added cart line, waiting for its availability check.
    pub fn pending(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
            status: ItemStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::pending(ItemStatus::Pending, true)]
    #[case::checking(ItemStatus::AvailabilityCheck, true)]
    #[case::available(ItemStatus::Available, true)]
    #[case::unavailable(ItemStatus::Unavailable, false)]
    #[case::reserved(ItemStatus::Reserved, false)]
    #[case::failed(ItemStatus::Failed, false)]
    fn potentially_available_statuses(#[case] status: ItemStatus, #[case] expected: bool) {
        assert_eq!(status.is_potentially_available(), expected);
    }

    #[test]
    fn status_serializes_as_screaming_snake_case() {
        let s = serde_json::to_string(&ItemStatus::AvailabilityCheck).unwrap();
        assert_eq!(s, "\"AVAILABILITY_CHECK\"");
        assert_eq!(ItemStatus::AvailabilityCheck.to_string(), "AVAILABILITY_CHECK");
    }

    #[test]
    fn new_item_starts_pending() {
        let item = NewItem::pending("laptop", 2);
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.quantity, 2);
    }
}
