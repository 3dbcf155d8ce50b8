//! Monthly subscription line-ups
//!
//! Served from a hand-curated JSON data file. Both the parsed file and every
//! assembled month are cached; refreshing a period drops the file cache and
//! that month so the next read picks up edits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use gamedex_common::monthly::{
    months_back, period_key, MonthRecord, PeriodMap, ProviderEntry, Subscription,
};
use gamedex_common::Result;

use crate::cache::TieredCache;

/// Cache key of the parsed data file
pub const PERIOD_MAP_KEY: &str = "monthly-games-period-map";

/// Default look-back of the recent-months listing
pub const DEFAULT_MONTHS_BACK: u32 = 12;

/// Upper bound on the look-back
pub const MAX_MONTHS_BACK: u32 = 120;

/// Cache key of one assembled month
pub fn month_cache_key(year: i32, month: u32) -> String {
    format!("monthly-games-{}", period_key(year, month))
}

pub struct MonthlyService {
    cache: Arc<TieredCache>,
    data_file: PathBuf,
}

impl MonthlyService {
    pub fn new(cache: Arc<TieredCache>, data_file: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            data_file: data_file.into(),
        }
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Whole data file, from cache when possible
    ///
    /// A missing or malformed file is an error; nothing is cached then.
    pub async fn period_map(&self) -> Result<PeriodMap> {
        if let Some(map) = self.cache.get::<PeriodMap>(PERIOD_MAP_KEY).await {
            return Ok(map);
        }

        let raw = tokio::fs::read_to_string(&self.data_file).await?;
        let map: PeriodMap = serde_json::from_str(&raw)?;
        info!(
            periods = map.len(),
            "Loaded monthly data from {}",
            self.data_file.display()
        );

        self.cache.set(PERIOD_MAP_KEY, &map).await;
        Ok(map)
    }

    /// One month, or None when the data file has no such period
    pub async fn month(&self, year: i32, month: u32) -> Result<Option<MonthRecord>> {
        let key = month_cache_key(year, month);
        if let Some(record) = self.cache.get::<MonthRecord>(&key).await {
            return Ok(Some(record));
        }

        let period = period_key(year, month);
        let Some(entries) = self.period_map().await?.remove(&period) else {
            debug!(period = %period, "No monthly data for period");
            return Ok(None);
        };

        let record = MonthRecord {
            year,
            month,
            period,
            entries,
        };
        self.cache.set(&key, &record).await;
        Ok(Some(record))
    }

    /// One month, optionally narrowed to a single subscription
    pub async fn month_for(
        &self,
        year: i32,
        month: u32,
        provider: Option<Subscription>,
    ) -> Result<Option<MonthRecord>> {
        let record = self.month(year, month).await?;
        Ok(match provider {
            Some(provider) => record.map(|r| r.for_provider(provider)),
            None => record,
        })
    }

    /// The `count` months ending at `year`/`month`, keeping only months with
    /// at least one entry
    pub async fn recent(
        &self,
        year: i32,
        month: u32,
        count: u32,
        provider: Option<Subscription>,
    ) -> Result<BTreeMap<String, Vec<ProviderEntry>>> {
        let mut months = BTreeMap::new();
        for (y, m) in months_back(year, month, count.min(MAX_MONTHS_BACK)) {
            if let Some(record) = self.month_for(y, m, provider).await? {
                if !record.entries.is_empty() {
                    months.insert(record.period, record.entries);
                }
            }
        }
        Ok(months)
    }

    /// Drop the cached data file and the month's record; returns the keys
    pub async fn invalidate(&self, year: i32, month: u32) -> Vec<String> {
        let keys = vec![PERIOD_MAP_KEY.to_string(), month_cache_key(year, month)];
        for key in &keys {
            self.cache.delete(key).await;
        }
        info!(period = %period_key(year, month), "Monthly cache invalidated");
        keys
    }
}
