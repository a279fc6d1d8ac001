use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A quote is `sent` when the technician issues the bill and becomes
/// `accepted` only through the payment workflow, never directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Sent,
    Accepted,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One billed position on a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: f64,
}

/// Itemized composition of a quote's total. Strongly typed; malformed item
/// payloads never reach the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub items: Vec<LineItem>,
    pub notes: Option<String>,
}

impl Breakdown {
    /// Validates raw line items the way the billing form does: descriptions
    /// are trimmed and must be non-empty, amounts must be finite and
    /// strictly positive. Invalid entries are dropped; returns `None` when
    /// nothing valid remains or the total is not positive.
    pub fn from_items(raw: Vec<LineItem>, notes: Option<String>) -> Option<(Breakdown, f64)> {
        let items: Vec<LineItem> = raw
            .into_iter()
            .map(|item| LineItem {
                description: item.description.trim().to_string(),
                amount: item.amount,
            })
            .filter(|item| {
                !item.description.is_empty() && item.amount.is_finite() && item.amount > 0.0
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        let total: f64 = items.iter().map(|item| item.amount).sum();
        if !(total > 0.0) {
            return None;
        }
        let notes = notes.filter(|n| !n.trim().is_empty());
        Some((Breakdown { items, notes }, total))
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(|item| item.amount).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub repair_request_id: ObjectId,
    pub technician_id: ObjectId,
    /// Always equals the sum of the breakdown items.
    pub amount: f64,
    pub currency: String,
    pub breakdown: Breakdown,
    pub status: QuoteStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Every produced record is billed in INR.
pub const QUOTE_CURRENCY: &str = "INR";

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, amount: f64) -> LineItem {
        LineItem {
            description: description.to_string(),
            amount,
        }
    }

    #[test]
    fn breakdown_total_is_item_sum() {
        let (breakdown, total) = Breakdown::from_items(
            vec![item("Screen", 100.0), item("Labor", 50.0)],
            None,
        )
        .unwrap();
        assert_eq!(total, 150.0);
        assert_eq!(breakdown.total(), total);
        assert_eq!(breakdown.items.len(), 2);
    }

    #[test]
    fn breakdown_filters_invalid_items() {
        let (breakdown, total) = Breakdown::from_items(
            vec![
                item("  Battery  ", 80.0),
                item("   ", 10.0),
                item("Free diagnosis", 0.0),
                item("Negative", -5.0),
                item("NaN", f64::NAN),
            ],
            Some("  ".to_string()),
        )
        .unwrap();
        assert_eq!(breakdown.items.len(), 1);
        assert_eq!(breakdown.items[0].description, "Battery");
        assert_eq!(total, 80.0);
        assert!(breakdown.notes.is_none());
    }

    #[test]
    fn breakdown_rejects_all_invalid() {
        assert!(Breakdown::from_items(vec![item("", 10.0)], None).is_none());
        assert!(Breakdown::from_items(vec![], None).is_none());
    }
}
