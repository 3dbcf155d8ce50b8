//! Section registry
//!
//! Curated game lists, each defined by a provider query and an optional
//! post-fetch transform. Relative time bounds ("last month", "next three
//! months") are resolved to Unix timestamps once, when the registry is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gamedex_common::api::DiscoverySectionMeta;
use gamedex_common::time::shift_months;
use gamedex_common::GameResult;

/// Provider entity queried by every built-in section
pub const GAMES_ENDPOINT: &str = "games";

/// Cache key prefix shared by all discovery entries
pub const SECTION_KEY_PREFIX: &str = "discovery:";

const COMMON_FIELDS: &str = "fields id, name, slug, summary, cover.url, first_release_date, \
total_rating, total_rating_count, platforms.name, platforms.slug, platforms.abbreviation, \
genres.name, genres.slug, involved_companies.company.name, involved_companies.developer, \
involved_companies.publisher;";

const SECTION_LIMIT: u32 = 20;

/// Post-fetch filtering the provider's query language cannot express
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SectionTransform {
    /// Keep games released strictly before `released_before` (Unix seconds)
    /// with strictly more than `min_rating_count` ratings
    #[serde(rename_all = "camelCase")]
    MinimumAge {
        released_before: i64,
        min_rating_count: u64,
    },
}

impl SectionTransform {
    pub fn apply(&self, games: Vec<GameResult>) -> Vec<GameResult> {
        match self {
            SectionTransform::MinimumAge {
                released_before,
                min_rating_count,
            } => games
                .into_iter()
                .filter(|game| {
                    game.first_release_date
                        .is_some_and(|released| released < *released_before)
                        && game
                            .total_rating_count
                            .is_some_and(|count| count > *min_rating_count)
                })
                .collect(),
        }
    }
}

/// One curated list
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySection {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Provider entity type the query targets
    pub endpoint: String,
    /// Query payload with all time bounds already resolved
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<SectionTransform>,
}

impl DiscoverySection {
    pub fn cache_key(&self) -> String {
        section_cache_key(&self.id)
    }

    /// Apply the section transform, if any
    pub fn apply_transform(&self, games: Vec<GameResult>) -> Vec<GameResult> {
        match &self.transform {
            Some(transform) => transform.apply(games),
            None => games,
        }
    }

    pub fn meta(&self, count: usize, last_updated: DateTime<Utc>) -> DiscoverySectionMeta {
        DiscoverySectionMeta {
            id: self.id.clone(),
            name: self.name.clone(),
            description: Some(self.description.clone()),
            count,
            last_updated,
        }
    }
}

/// Cache key of a section's game list
pub fn section_cache_key(id: &str) -> String {
    format!("{}{}", SECTION_KEY_PREFIX, id)
}

fn games_query(filter: &str, sort: &str) -> String {
    format!(
        "{} where {}; sort {}; limit {};",
        COMMON_FIELDS, filter, sort, SECTION_LIMIT
    )
}

/// Immutable, ordered table of sections
#[derive(Debug, Clone, Serialize)]
pub struct SectionRegistry {
    sections: Vec<DiscoverySection>,
}

impl SectionRegistry {
    /// Built-in sections with time bounds relative to `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        let unix_now = now.timestamp();
        let one_month_ago = shift_months(now, -1).timestamp();
        let one_year_ago = shift_months(now, -12).timestamp();
        let three_months_ahead = shift_months(now, 3).timestamp();
        let five_years_ago = shift_months(now, -60).timestamp();

        let section = |id: &str, name: &str, description: &str, query: String| DiscoverySection {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            endpoint: GAMES_ENDPOINT.to_string(),
            query,
            transform: None,
        };

        let sections = vec![
            section(
                "upcoming",
                "Upcoming Games",
                "Games releasing in the next 3 months",
                games_query(
                    &format!(
                        "first_release_date >= {} & first_release_date <= {} & status = 0",
                        unix_now, three_months_ahead
                    ),
                    "first_release_date asc",
                ),
            ),
            section(
                "trending",
                "Trending Games",
                "Popular games from the last month",
                games_query(
                    &format!(
                        "first_release_date >= {} & first_release_date <= {} & total_rating_count > 5",
                        one_month_ago, unix_now
                    ),
                    "hypes desc",
                ),
            ),
            section(
                "topRated",
                "Top Rated Games",
                "Highest-rated games released in the last year",
                games_query(
                    &format!(
                        "first_release_date >= {} & first_release_date <= {} & total_rating_count > 10 & total_rating > 80",
                        one_year_ago, unix_now
                    ),
                    "total_rating desc",
                ),
            ),
            section(
                "hidden-gems",
                "Hidden Gems",
                "Highly-rated games with lower popularity/recognition",
                games_query(
                    &format!(
                        "total_rating > 80 & total_rating_count <= 50 & total_rating_count > 5 & first_release_date < {} & first_release_date > {}",
                        unix_now, one_year_ago
                    ),
                    "total_rating desc",
                ),
            ),
            DiscoverySection {
                transform: Some(SectionTransform::MinimumAge {
                    released_before: five_years_ago,
                    min_rating_count: 200,
                }),
                ..section(
                    "classics",
                    "Classic Games",
                    "Influential games from previous generations",
                    games_query(
                        &format!(
                            "total_rating > 85 & total_rating_count > 100 & first_release_date < {}",
                            one_year_ago
                        ),
                        "total_rating desc",
                    ),
                )
            },
            section(
                "recent-releases",
                "Recent Releases",
                "Games released in the last 30 days",
                games_query(
                    &format!(
                        "first_release_date >= {} & first_release_date <= {}",
                        one_month_ago, unix_now
                    ),
                    "first_release_date desc",
                ),
            ),
        ];

        Self { sections }
    }

    pub fn get(&self, id: &str) -> Option<&DiscoverySection> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// Sections in registry order
    pub fn iter(&self) -> impl Iterator<Item = &DiscoverySection> {
        self.sections.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
