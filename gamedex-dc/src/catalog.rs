//! Ad-hoc catalogue lookups
//!
//! Game detail, similar games and franchise listings. Every lookup goes
//! through [`ProviderClient`], so it shares the process-wide rate limit and
//! token. Results are cached under their own keys; "not found" is not cached.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use gamedex_common::games::NamedRef;
use gamedex_common::GameResult;

use crate::cache::TieredCache;
use crate::provider::{ProviderClient, ProviderResult};

const GAMES_ENDPOINT: &str = "games";
const FRANCHISES_ENDPOINT: &str = "franchises";

/// Related games returned per lookup
const SIMILAR_LIMIT: usize = 6;
const FRANCHISE_LIMIT: usize = 50;

const DETAIL_FIELDS: &str = "fields name, slug, cover.url, summary, screenshots.url, videos.*, \
platforms.name, involved_companies.company.name, involved_companies.developer, \
involved_companies.publisher, first_release_date, genres.name, game_modes.name, url, \
total_rating, total_rating_count, similar_games, franchise.name, franchise.id, franchises.name, \
franchises.id;";

const RELATED_FIELDS: &str =
    "fields name, slug, cover.url, first_release_date, genres.name, total_rating;";

/// Why a game was suggested as similar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SimilarityReason {
    #[serde(rename = "Recommended by IGDB")]
    Recommended,
    #[serde(rename = "Same genre")]
    SameGenre,
    #[serde(rename = "Popular")]
    Popular,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarGame {
    #[serde(flatten)]
    pub game: GameResult,
    pub similarity_reason: SimilarityReason,
}

/// Franchise identity as returned to consumers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FranchiseSummary {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FranchiseGames {
    pub franchise: FranchiseSummary,
    pub games: Vec<GameResult>,
}

/// Fields of a game needed to pick similar games
#[derive(Debug, Deserialize)]
struct SimilarSeed {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    similar_games: Option<Vec<u64>>,
    #[serde(default)]
    genres: Option<Vec<NamedRef>>,
}

#[derive(Debug, Deserialize)]
struct FranchiseRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    games: Option<Vec<u64>>,
}

fn id_list(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

fn normalize_all(games: Vec<GameResult>) -> Vec<GameResult> {
    games.into_iter().map(GameResult::with_normalized_cover).collect()
}

pub struct CatalogService {
    client: Arc<ProviderClient>,
    cache: Arc<TieredCache>,
}

impl CatalogService {
    pub fn new(client: Arc<ProviderClient>, cache: Arc<TieredCache>) -> Self {
        Self { client, cache }
    }

    /// Full record of one game; `None` if the provider does not know it
    pub async fn game_by_id(&self, id: u64) -> ProviderResult<Option<GameResult>> {
        let key = format!("game-detail-{}", id);
        if let Some(game) = self.cache.get::<GameResult>(&key).await {
            return Ok(Some(game));
        }

        let query = format!("{} where id = {}; limit 1;", DETAIL_FIELDS, id);
        let games: Vec<GameResult> = self.client.fetch(GAMES_ENDPOINT, &query).await?;

        let Some(game) = games.into_iter().next() else {
            debug!(game_id = id, "Game not found");
            return Ok(None);
        };

        let game = game.with_normalized_cover();
        info!(game_id = id, name = %game.name, "Fetched game detail");
        self.cache.set(&key, &game).await;
        Ok(Some(game))
    }

    /// Games similar to `id`
    ///
    /// Uses the provider's own similar-games list when present, otherwise
    /// games sharing a genre, otherwise popular games.
    pub async fn similar_games(&self, id: u64) -> ProviderResult<Option<Vec<SimilarGame>>> {
        let key = format!("similar-games-{}", id);
        if let Some(similar) = self.cache.get::<Vec<SimilarGame>>(&key).await {
            return Ok(Some(similar));
        }

        let query = format!(
            "fields similar_games, name, genres.name; where id = {}; limit 1;",
            id
        );
        let seeds: Vec<SimilarSeed> = self.client.fetch(GAMES_ENDPOINT, &query).await?;
        let Some(seed) = seeds.into_iter().next() else {
            return Ok(None);
        };

        let similar_ids: Vec<u64> = seed
            .similar_games
            .unwrap_or_default()
            .into_iter()
            .take(SIMILAR_LIMIT)
            .collect();
        let genre_ids: Vec<u64> = seed
            .genres
            .unwrap_or_default()
            .iter()
            .map(|genre| genre.id)
            .collect();

        let (query, reason) = if !similar_ids.is_empty() {
            (
                format!(
                    "{} where id = ({}) & cover != null; limit {};",
                    RELATED_FIELDS,
                    id_list(&similar_ids),
                    SIMILAR_LIMIT
                ),
                SimilarityReason::Recommended,
            )
        } else if !genre_ids.is_empty() {
            (
                format!(
                    "{} where genres = ({}) & id != {} & cover != null; sort total_rating desc; limit {};",
                    RELATED_FIELDS,
                    id_list(&genre_ids),
                    id,
                    SIMILAR_LIMIT
                ),
                SimilarityReason::SameGenre,
            )
        } else {
            (
                format!(
                    "{} where total_rating > 75 & cover != null & id != {}; sort total_rating desc; limit {};",
                    RELATED_FIELDS, id, SIMILAR_LIMIT
                ),
                SimilarityReason::Popular,
            )
        };

        debug!(
            game_id = id,
            name = seed.name.as_deref().unwrap_or(""),
            reason = ?reason,
            "Looking up similar games"
        );

        let games: Vec<GameResult> = self.client.fetch(GAMES_ENDPOINT, &query).await?;
        let similar: Vec<SimilarGame> = normalize_all(games)
            .into_iter()
            .map(|game| SimilarGame {
                game,
                similarity_reason: reason,
            })
            .collect();

        self.cache.set(&key, &similar).await;
        Ok(Some(similar))
    }

    /// A franchise and its games, oldest first
    pub async fn franchise(&self, franchise_id: u64) -> ProviderResult<Option<FranchiseGames>> {
        let key = format!("franchise-games-{}", franchise_id);
        if let Some(franchise) = self.cache.get::<FranchiseGames>(&key).await {
            return Ok(Some(franchise));
        }

        let query = format!(
            "fields name, slug, games, url; where id = {}; limit 1;",
            franchise_id
        );
        let records: Vec<FranchiseRecord> = self.client.fetch(FRANCHISES_ENDPOINT, &query).await?;
        let Some(record) = records.into_iter().next() else {
            return Ok(None);
        };

        let member_ids = record.games.unwrap_or_default();
        let games = if member_ids.is_empty() {
            Vec::new()
        } else {
            let query = format!(
                "{} where id = ({}) & cover != null; sort first_release_date asc; limit {};",
                RELATED_FIELDS,
                id_list(&member_ids),
                FRANCHISE_LIMIT
            );
            let games: Vec<GameResult> = self.client.fetch(GAMES_ENDPOINT, &query).await?;
            normalize_all(games)
        };

        let response = FranchiseGames {
            franchise: FranchiseSummary {
                id: franchise_id,
                name: record.name,
                slug: record.slug,
                url: record.url,
            },
            games,
        };

        self.cache.set(&key, &response).await;
        Ok(Some(response))
    }
}
