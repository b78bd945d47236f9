use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::meals::{InMemoryMealStore, MealStore, PgMealStore};
use crate::nutrition::{reference_table, NutritionTable};
use crate::photos::{PhotoStore, S3PhotoStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub meals: Arc<dyn MealStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub foods: &'static NutritionTable,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let meals: Arc<dyn MealStore> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgMealStore::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; meals are kept in memory");
                Arc::new(InMemoryMealStore::new())
            }
        };

        let photos = Arc::new(S3PhotoStore::new(&config.storage).await) as Arc<dyn PhotoStore>;
        info!(foods = reference_table().len(), "reference table loaded");

        Ok(Self::from_parts(config, meals, photos, Arc::new(SystemClock)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        meals: Arc<dyn MealStore>,
        photos: Arc<dyn PhotoStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            meals,
            photos,
            foods: reference_table(),
            clock,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory meals, a photo store that accepts everything, and a pinned clock.
    pub(crate) fn fake(now: time::OffsetDateTime) -> Self {
        use async_trait::async_trait;
        use bytes::Bytes;

        use crate::clock::FixedClock;
        use crate::config::{JwtConfig, StorageConfig};

        struct FakePhotos;
        #[async_trait]
        impl PhotoStore for FakePhotos {
            async fn put(&self, _key: &str, _body: Bytes, _ct: &str) -> anyhow::Result<()> {
                Ok(())
            }
            async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
                Ok(format!("https://photos.test/{key}?ttl={seconds}"))
            }
        }

        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            storage: StorageConfig {
                endpoint: "fake".into(),
                bucket: "fake".into(),
                access_key: "fake".into(),
                secret_key: "fake".into(),
                region: "us-east-1".into(),
                url_ttl_secs: 600,
            },
            default_tz_offset_minutes: 0,
        });

        Self::from_parts(
            config,
            Arc::new(InMemoryMealStore::new()),
            Arc::new(FakePhotos),
            Arc::new(FixedClock(now)),
        )
    }
}
