use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::attendance::catalog::{DEFAULT_CATALOG, ShiftScheduleCatalog};
use crate::attendance::error::AttendanceError;
use crate::attendance::evaluator::ScheduleConfig;
use crate::db;
use crate::model::schedule::ScheduleSettings;

/// Schedules change rarely; readers tolerate this much staleness.
pub const MAX_TTL_SECS: u64 = 60;

/// Where schedule configuration is read from on a cache miss.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn catalog(&self) -> Result<ShiftScheduleCatalog>;

    async fn settings(&self, company_id: u64) -> Result<ScheduleSettings>;
}

pub struct MySqlScheduleSource {
    pool: MySqlPool,
}

impl MySqlScheduleSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleSource for MySqlScheduleSource {
    async fn catalog(&self) -> Result<ShiftScheduleCatalog> {
        let rows = db::load_shift_schedules(&self.pool).await?;
        if rows.is_empty() {
            return Ok(DEFAULT_CATALOG.clone());
        }
        Ok(ShiftScheduleCatalog::from_rows(rows))
    }

    async fn settings(&self, company_id: u64) -> Result<ScheduleSettings> {
        // a tenant without a settings row is strict
        Ok(db::load_schedule_settings(&self.pool, company_id)
            .await?
            .map(ScheduleSettings::from)
            .unwrap_or_default())
    }
}

/// Process-wide cache of the shift catalog and tenant settings.
pub struct ScheduleCache {
    source: Arc<dyn ScheduleSource>,
    catalog: Cache<(), Arc<ShiftScheduleCatalog>>,
    settings: Cache<u64, Arc<ScheduleSettings>>,
}

impl ScheduleCache {
    pub fn new(source: Arc<dyn ScheduleSource>, ttl: Duration) -> Self {
        let ttl = ttl.min(Duration::from_secs(MAX_TTL_SECS));

        Self {
            source,
            catalog: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            settings: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Configuration in effect for a tenant. Concurrent misses load once.
    pub async fn config_for(&self, company_id: u64) -> Result<ScheduleConfig, AttendanceError> {
        let catalog = self
            .catalog
            .try_get_with((), async { self.source.catalog().await.map(Arc::new) })
            .await
            .map_err(|e| AttendanceError::store(anyhow!("loading shift catalog: {e}")))?;

        let settings = self
            .settings
            .try_get_with(company_id, async {
                self.source.settings(company_id).await.map(Arc::new)
            })
            .await
            .map_err(|e| {
                AttendanceError::store(anyhow!("loading schedule settings for {company_id}: {e}"))
            })?;

        Ok(ScheduleConfig { catalog, settings })
    }

    pub async fn invalidate_catalog(&self) {
        self.catalog.invalidate(&()).await;
    }

    pub async fn invalidate_tenant(&self, company_id: u64) {
        self.settings.invalidate(&company_id).await;
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves fixed configuration and counts loads.
    pub struct StaticScheduleSource {
        pub catalog: ShiftScheduleCatalog,
        pub settings: ScheduleSettings,
        pub catalog_loads: AtomicUsize,
        pub settings_loads: AtomicUsize,
    }

    impl StaticScheduleSource {
        pub fn new(catalog: ShiftScheduleCatalog, settings: ScheduleSettings) -> Self {
            Self {
                catalog,
                settings,
                catalog_loads: AtomicUsize::new(0),
                settings_loads: AtomicUsize::new(0),
            }
        }

        pub fn strict_default() -> Self {
            Self::new(DEFAULT_CATALOG.clone(), ScheduleSettings::default())
        }
    }

    #[async_trait]
    impl ScheduleSource for StaticScheduleSource {
        async fn catalog(&self) -> Result<ShiftScheduleCatalog> {
            self.catalog_loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.catalog.clone())
        }

        async fn settings(&self, _company_id: u64) -> Result<ScheduleSettings> {
            self.settings_loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.settings.clone())
        }
    }
}
