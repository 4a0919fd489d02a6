//! Identifier newtypes shared across the workspace.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an order.
///
/// Every crate refers to orders through this newtype rather than a raw
/// UUID; it serializes transparently, so stored order documents and the
/// wire messages carry the plain UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Generates a fresh random order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for OrderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_do_not_collide() {
        assert_ne!(OrderId::new(), OrderId::new());
    }

    #[test]
    fn test_serializes_as_the_bare_uuid() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&OrderId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));

        let parsed: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_display_prints_the_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(OrderId::from_uuid(uuid).to_string(), uuid.to_string());
    }

    #[test]
    fn test_uuid_conversions() {
        let uuid = Uuid::new_v4();
        let id: OrderId = uuid.into();
        assert_eq!(Uuid::from(id), uuid);
    }
}
