use axum::{routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::admin_user_conf::AdminUserConfig;
use crate::config::app_conf::AppConfig;
use crate::config::jwt_conf::JwtConfig;
use crate::config::mongo_conf::MongoConfig;
use crate::middlewares::auth_middleware::AuthState;
use crate::model::role::UserRole;
use crate::model::user::User;
use crate::repository::device_repo::MongoDeviceRepository;
use crate::repository::payment_repo::MongoPaymentRepository;
use crate::repository::quote_repo::MongoQuoteRepository;
use crate::repository::repair_request_repo::MongoRepairRequestRepository;
use crate::repository::saved_card_repo::MongoSavedCardRepository;
use crate::repository::store::MongoStore;
use crate::repository::success_story_repo::MongoSuccessStoryRepository;
use crate::repository::user_repo::{MongoUserRepository, UserRepository};
use crate::router::billing_router::billing_router;
use crate::router::repair_router::repair_router;
use crate::router::story_router::story_router;
use crate::router::user_router::user_router;
use crate::service::lifecycle_service::LifecycleServiceImpl;
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::service::view_service::ViewServiceImpl;
use crate::service::Services;
use crate::util::jwt::JwtTokenUtilsImpl;

pub struct App {
    config: AppConfig,
    router: Router,
    pub user_service: Arc<UserServiceImpl>,
    pub services: Arc<Services>,
}

impl App {
    pub async fn new() -> Self {
        let config = AppConfig::from_env();
        let jwt_config = JwtConfig::from_env().expect("JWT config error");
        let mongo_config = MongoConfig::from_env().expect("Mongo config error");

        let store = MongoStore::connect(&mongo_config)
            .await
            .expect("Failed to connect to MongoDB");

        let user_repo: Arc<dyn crate::repository::user_repo::UserRepository> =
            Arc::new(MongoUserRepository::new(&store));
        let device_repo: Arc<dyn crate::repository::device_repo::DeviceRepository> =
            Arc::new(MongoDeviceRepository::new(&store));
        let repair_repo: Arc<dyn crate::repository::repair_request_repo::RepairRequestRepository> =
            Arc::new(MongoRepairRequestRepository::new(&store));
        let quote_repo: Arc<dyn crate::repository::quote_repo::QuoteRepository> =
            Arc::new(MongoQuoteRepository::new(&store));
        let payment_repo: Arc<dyn crate::repository::payment_repo::PaymentRepository> =
            Arc::new(MongoPaymentRepository::new(&store));
        let card_repo: Arc<dyn crate::repository::saved_card_repo::SavedCardRepository> =
            Arc::new(MongoSavedCardRepository::new(&store));
        let story_repo: Arc<dyn crate::repository::success_story_repo::SuccessStoryRepository> =
            Arc::new(MongoSuccessStoryRepository::new(&store));

        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        let user_service = Arc::new(UserServiceImpl::new(user_repo.clone(), jwt_utils.clone()));

        let lifecycle = Arc::new(LifecycleServiceImpl::new(
            repair_repo.clone(),
            device_repo.clone(),
            quote_repo.clone(),
            payment_repo.clone(),
            card_repo.clone(),
            story_repo.clone(),
            user_repo.clone(),
        ));
        let views = Arc::new(ViewServiceImpl::new(
            repair_repo,
            device_repo,
            quote_repo,
            payment_repo,
            card_repo,
            story_repo,
            user_repo,
        ));
        let services = Arc::new(Services { lifecycle, views });

        let auth_state = Arc::new(AuthState {
            jwt_utils: jwt_utils.clone(),
        });

        let router = Self::create_router(services.clone(), user_service.clone(), auth_state);

        let app = App {
            config,
            router,
            user_service,
            services,
        };
        app.create_first_admin_user().await;
        app
    }

    fn create_router(
        services: Arc<Services>,
        user_service: Arc<UserServiceImpl>,
        auth_state: Arc<AuthState>,
    ) -> Router {
        Router::new()
            .merge(repair_router(services.clone(), auth_state.clone()))
            .merge(billing_router(services.clone(), auth_state.clone()))
            .merge(story_router(services, auth_state))
            .merge(user_router(user_service))
            .route(
                "/health",
                get(|| async {
                    Json(serde_json::json!({
                        "status": "ok",
                        "service": "startronics-backend",
                        "version": env!("CARGO_PKG_VERSION"),
                    }))
                }),
            )
    }

    pub async fn start(self) {
        let addr = SocketAddr::new(self.config.host.parse().expect("Invalid host"), self.config.port);
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind address");
        axum::serve(listener, self.router)
            .await
            .expect("Failed to start server");
    }

    async fn create_first_admin_user(&self) {
        let admin_conf = match AdminUserConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                warn!("Admin user config not loaded: {e}");
                return;
            }
        };

        let user_repo = self.user_service.user_repo.clone();
        match user_repo.find_by_email(&admin_conf.email).await {
            Ok(Some(_)) => {
                info!("Admin user already exists, skipping creation.");
                return;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Failed to check for existing admin user: {e}");
                return;
            }
        }

        let user = User {
            id: None,
            username: admin_conf.username.clone(),
            first_name: admin_conf.first_name.clone(),
            last_name: admin_conf.last_name.clone(),
            email: admin_conf.email.clone(),
            password_hash: String::new(), // Will be set by register
            role: UserRole::Admin,
            created_at: None,
            updated_at: None,
        };
        match self.user_service.register(user, admin_conf.password.clone()).await {
            Ok(_) => info!("First admin user created."),
            Err(e) => error!("Failed to create admin user: {e}"),
        }
    }
}
