pub mod lifecycle_service;
pub mod user_service;
pub mod view_service;

use std::sync::Arc;

use lifecycle_service::LifecycleServiceImpl;
use view_service::ViewServiceImpl;

/// Shared handler state: the lifecycle coordinator and the read-side views.
pub struct Services {
    pub lifecycle: Arc<LifecycleServiceImpl>,
    pub views: Arc<ViewServiceImpl>,
}
