use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Post-payment testimonial, shown publicly on the landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessStory {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub quote_id: ObjectId,
    /// 1 to 5.
    pub rating: u8,
    pub story: String,
    pub image_url: Option<String>,
    pub created_at: Option<String>,
}
