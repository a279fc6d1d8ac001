use serde::{Deserialize, Serialize};
use validator::Validate;

/// Raw line item as submitted by the billing form; validated and filtered
/// by the coordinator before anything is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemDto {
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueBillDto {
    pub items: Vec<LineItemDto>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditBillDto {
    pub items: Vec<LineItemDto>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Card,
    Upi,
    Netbanking,
    Wallet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetailsDto {
    pub card_number: String,
    pub card_holder_name: String,
    /// MM/YY
    pub expiry: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentDto {
    pub amount: f64,
    pub currency: String,
    pub method: PaymentMethodKind,
    pub card: Option<CardDetailsDto>,
    /// Hex id of a saved card to pay with instead of fresh card details.
    pub saved_card_id: Option<String>,
    pub upi_id: Option<String>,
    #[serde(default)]
    pub save_card: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveCardDto {
    pub card_number: String,
    pub card_holder_name: String,
    /// MM/YY
    pub expiry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddStoryDto {
    /// Hex id of the paid quote the story is about.
    pub quote_id: String,

    #[validate(range(min = 1, max = 5))]
    pub rating: u8,

    #[validate(length(min = 1, max = 4000))]
    pub story: String,

    pub image_url: Option<String>,
}
