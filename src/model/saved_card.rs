use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Unknown,
}

impl CardBrand {
    /// Brand detection from the leading digit, as the checkout form does.
    pub fn detect(card_number: &str) -> CardBrand {
        match card_number.chars().next() {
            Some('4') => CardBrand::Visa,
            Some('5') => CardBrand::Mastercard,
            Some('3') => CardBrand::Amex,
            _ => CardBrand::Unknown,
        }
    }
}

/// Tokenized-in-appearance payment method: only the last four digits are
/// retained. At most one card per user is the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCard {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub card_last4: String,
    pub card_brand: CardBrand,
    pub card_holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub is_default: bool,
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_detection_follows_leading_digit() {
        assert_eq!(CardBrand::detect("4111111111111111"), CardBrand::Visa);
        assert_eq!(CardBrand::detect("5500000000000004"), CardBrand::Mastercard);
        assert_eq!(CardBrand::detect("340000000000009"), CardBrand::Amex);
        assert_eq!(CardBrand::detect("6011000000000004"), CardBrand::Unknown);
        assert_eq!(CardBrand::detect(""), CardBrand::Unknown);
    }
}
