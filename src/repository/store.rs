use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, ClientSession, Database};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::config::mongo_conf::MongoConfig;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// Shared MongoDB handle. Built once at startup and injected into every
/// repository; business logic never reaches for a global client.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self, mongodb::error::Error> {
        let mut client_options = ClientOptions::parse(&config.uri).await?;
        client_options.app_name = Some("StartronicsBackend".to_string());
        client_options.max_pool_size = Some(config.pool_size);
        client_options.connect_timeout =
            Some(std::time::Duration::from_secs(config.connection_timeout_secs));

        if let (Some(ref username), Some(ref password)) = (&config.username, &config.password) {
            client_options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(password.clone())
                    .build(),
            );
        }

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database);
        info!(database = %config.database, "Connected to MongoDB");
        Ok(MongoStore { client, db })
    }

    pub fn collection<T: Serialize + DeserializeOwned + Unpin + Send + Sync>(
        &self,
        name: &str,
    ) -> mongodb::Collection<T> {
        self.db.collection::<T>(name)
    }

    /// Opens a session with a transaction already started. The dual-write
    /// workflows commit or abort as one unit through this.
    pub async fn start_transaction(&self) -> RepositoryResult<ClientSession> {
        let mut session = self
            .client
            .start_session(None)
            .await
            .map_err(RepositoryError::from)?;
        session
            .start_transaction(None)
            .await
            .map_err(RepositoryError::from)?;
        Ok(session)
    }
}

pub mod collections {
    pub const USERS: &str = "users";
    pub const DEVICES: &str = "devices";
    pub const REPAIR_REQUESTS: &str = "repair_requests";
    pub const QUOTES: &str = "quotes";
    pub const PAYMENTS: &str = "payments";
    pub const SAVED_CARDS: &str = "saved_cards";
    pub const SUCCESS_STORIES: &str = "success_stories";
}
