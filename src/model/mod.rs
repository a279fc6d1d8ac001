pub mod device;
pub mod payment;
pub mod quote;
pub mod repair_request;
pub mod role;
pub mod saved_card;
pub mod success_story;
pub mod user;
