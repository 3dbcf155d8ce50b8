//! Monthly subscription catalogue records
//!
//! Which games each subscription service adds in a given month. The data is
//! curated by hand in a JSON file keyed by "YYYY-MM" period.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Subscription service offering a monthly game line-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subscription {
    PlaystationPlus,
    XboxGamePass,
    EpicGamesStore,
}

impl Subscription {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::PlaystationPlus => "playstation-plus",
            Subscription::XboxGamePass => "xbox-game-pass",
            Subscription::EpicGamesStore => "epic-games-store",
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subscription {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playstation-plus" => Ok(Subscription::PlaystationPlus),
            "xbox-game-pass" => Ok(Subscription::XboxGamePass),
            "epic-games-store" => Ok(Subscription::EpicGamesStore),
            other => Err(format!("Unknown provider '{}'", other)),
        }
    }
}

/// PlayStation Plus membership tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaystationTier {
    Essential,
    Extra,
    Premium,
}

/// One game in a monthly line-up
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyGame {
    /// Metadata provider identifier
    pub igdb_id: u64,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A subscription's line-up for one month
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderEntry {
    pub provider: Subscription,
    /// Only set for PlayStation Plus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<PlaystationTier>,
    pub games: Vec<MonthlyGame>,
}

/// Everything known about one month
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonthRecord {
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// "YYYY-MM"
    pub period: String,
    pub entries: Vec<ProviderEntry>,
}

impl MonthRecord {
    /// Copy keeping only `provider`'s entries
    pub fn for_provider(&self, provider: Subscription) -> MonthRecord {
        MonthRecord {
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.provider == provider)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// Data file contents: period → entries
pub type PeriodMap = BTreeMap<String, Vec<ProviderEntry>>;

/// "YYYY-MM" for a year and month
pub fn period_key(year: i32, month: u32) -> String {
    format!("{}-{:02}", year, month)
}

/// Parse a strict "YYYY-MM" period (four-digit year, month 01-12)
pub fn parse_period(period: &str) -> Option<(i32, u32)> {
    let (year, month) = period.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year.parse().ok()?, month))
}

/// Current UTC year and month
pub fn current_year_month() -> (i32, u32) {
    let today = Utc::now();
    (today.year(), today.month())
}

/// `count` consecutive months ending at (and including) `year`/`month`,
/// newest first
pub fn months_back(year: i32, month: u32, count: u32) -> Vec<(i32, u32)> {
    let anchor = year * 12 + month as i32 - 1;
    (0..count as i32)
        .map(|offset| {
            let index = anchor - offset;
            (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .collect()
}
