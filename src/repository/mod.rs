pub mod device_repo;
pub mod memory;
pub mod payment_repo;
pub mod quote_repo;
pub mod repair_request_repo;
pub mod repository_error;
pub mod saved_card_repo;
pub mod store;
pub mod success_story_repo;
pub mod user_repo;
