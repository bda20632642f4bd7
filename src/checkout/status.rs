use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
}

impl CanonicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "Pending",
            CanonicalStatus::Processing => "Processing",
            CanonicalStatus::Shipped => "Shipped",
            CanonicalStatus::Delivered => "Delivered",
        }
    }
}

/// Status as shown to buyers: a canonical value, or the raw text when no rule matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayStatus {
    Canonical(CanonicalStatus),
    Unmapped(String),
}

impl DisplayStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DisplayStatus::Canonical(status) => status.as_str(),
            DisplayStatus::Unmapped(raw) => raw,
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DisplayStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Order matters: "ready to ship after processing" is Shipped.
const RULES: [(&str, CanonicalStatus); 4] = [
    ("deliver", CanonicalStatus::Delivered),
    ("ship", CanonicalStatus::Shipped),
    ("process", CanonicalStatus::Processing),
    ("pend", CanonicalStatus::Pending),
];

/// Maps free-text status written by sellers, couriers or webhooks to the
/// canonical vocabulary by case-insensitive substring match.
pub fn normalize(raw: &str) -> DisplayStatus {
    let lowered = raw.to_lowercase();
    RULES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, status)| DisplayStatus::Canonical(*status))
        .unwrap_or_else(|| DisplayStatus::Unmapped(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_phrases() {
        assert_eq!(normalize("Out for Delivery").as_str(), "Delivered");
        assert_eq!(normalize("Ready to ship").as_str(), "Shipped");
        assert_eq!(normalize("Processing payment").as_str(), "Processing");
        assert_eq!(normalize("Pending approval").as_str(), "Pending");
    }

    #[test]
    fn unmapped_passes_through_unchanged() {
        assert_eq!(
            normalize("Cancelled"),
            DisplayStatus::Unmapped("Cancelled".into())
        );
        assert_eq!(normalize("").as_str(), "");
    }

    #[test]
    fn earlier_rules_win() {
        assert_eq!(
            normalize("ready to ship after processing"),
            DisplayStatus::Canonical(CanonicalStatus::Shipped)
        );
        assert_eq!(
            normalize("SHIPPED, DELIVERY PENDING"),
            DisplayStatus::Canonical(CanonicalStatus::Delivered)
        );
    }
}
