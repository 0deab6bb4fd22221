use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::{
    jwt::JwtKeys, memory::InMemoryCredentialStore, password::PasswordHasher,
    repo::{CredentialStore, PgCredentialStore},
};
use crate::config::{AppConfig, StoreConfig};
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CredentialStore>,
    pub keys: Arc<JwtKeys>,
    pub hasher: PasswordHasher,
}

impl AppState {
    /// Builds every long-lived component from the config. Fails before the
    /// server binds if the signing secret or the store is unusable.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let keys = Arc::new(JwtKeys::new(&config.jwt).context("jwt keys")?);
        let hasher = PasswordHasher::new(&config.password).context("password hasher")?;

        let store: Arc<dyn CredentialStore> = match &config.store {
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let pool = db::connect(database_url, *max_connections).await?;
                db::migrate(&pool).await?;
                info!("using postgres credential store");
                Arc::new(PgCredentialStore::new(pool))
            }
            StoreConfig::Memory => {
                warn!("using in-memory credential store; users are lost on restart");
                Arc::new(InMemoryCredentialStore::new())
            }
        };

        Ok(Self::from_parts(Arc::new(config), store, keys, hasher))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn CredentialStore>,
        keys: Arc<JwtKeys>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            config,
            store,
            keys,
            hasher,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, PasswordConfig};

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreConfig::Memory,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            password: PasswordConfig {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
        });
        let keys = Arc::new(JwtKeys::new(&config.jwt).expect("test keys"));
        let hasher = PasswordHasher::new(&config.password).expect("test hasher");
        let store = Arc::new(InMemoryCredentialStore::new()) as Arc<dyn CredentialStore>;
        Self::from_parts(config, store, keys, hasher)
    }
}
