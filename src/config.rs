//! Persistent pipeline configuration model and defaults.

use std::path::PathBuf;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Encyclopedia lookup tiers and HTTP behavior.
    pub wikipedia: WikipediaConfig,
    #[serde(default)]
    /// Polarity lexicons and scoring switches.
    pub sentiment: SentimentConfig,
    #[serde(default)]
    /// Community detection settings.
    pub community: CommunityConfig,
    #[serde(default)]
    /// Corpus and term-ranking settings.
    pub analysis: AnalysisConfig,
    #[serde(default)]
    /// On-disk article cache.
    pub cache: CacheConfig,
}

/// Language tiers, title suffixes and request pacing for article lookups.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct WikipediaConfig {
    #[serde(default = "default_primary_language")]
    pub primary_language: String,
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,
    /// Title suffixes tried in order against the primary language.
    #[serde(default = "default_primary_suffixes")]
    pub primary_suffixes: Vec<String>,
    /// Title suffixes tried in order once the primary tier is exhausted.
    #[serde(default = "default_fallback_suffixes")]
    pub fallback_suffixes: Vec<String>,
    /// Minimum spacing between two outgoing requests.
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Total tries for a request that timed out or was throttled (including the first one).
    #[serde(default = "default_timeout_retry_attempts")]
    pub timeout_retry_attempts: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Lexicon overrides and the cross-lexicon filter switch.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SentimentConfig {
    /// Replaces the bundled primary-language lexicon when set.
    #[serde(default)]
    pub primary_lexicon_path: Option<PathBuf>,
    /// Replaces the bundled fallback-language lexicon when set.
    #[serde(default)]
    pub fallback_lexicon_path: Option<PathBuf>,
    /// Filter tokens by their primary-lexicon polarity even for fallback text.
    #[serde(default = "default_true")]
    pub filter_with_primary_lexicon: bool,
}

/// Community detection settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommunityConfig {
    /// Shuffle seed; drawn from OS entropy and logged when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Corpus aggregation and term-ranking settings.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_top_communities")]
    pub top_communities: usize,
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    /// Terms present in more than this share of documents are dropped.
    #[serde(default = "default_max_df")]
    pub max_df: f64,
    /// Clear fallback-language articles before building community documents.
    #[serde(default = "default_true")]
    pub purge_fallback_text: bool,
}

/// Article cache preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Database location; defaults to the user cache directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_cache_ttl_days")]
    pub ttl_days: u32,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            primary_language: default_primary_language(),
            fallback_language: default_fallback_language(),
            primary_suffixes: default_primary_suffixes(),
            fallback_suffixes: default_fallback_suffixes(),
            request_interval_ms: default_request_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            timeout_retry_attempts: default_timeout_retry_attempts(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            primary_lexicon_path: None,
            fallback_lexicon_path: None,
            filter_with_primary_lexicon: true,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_communities: default_top_communities(),
            top_terms: default_top_terms(),
            max_features: default_max_features(),
            max_df: default_max_df(),
            purge_fallback_text: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            ttl_days: default_cache_ttl_days(),
        }
    }
}

impl CacheConfig {
    /// Configured database path, or `<cache dir>/festigraph/articles.db`.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        dirs::cache_dir().map(|dir| dir.join("festigraph").join("articles.db"))
    }
}

/// Clamps numeric settings into usable ranges.
pub fn sanitize_config(config: Config) -> Config {
    let Config {
        wikipedia,
        sentiment,
        community,
        analysis,
        cache,
    } = config;

    Config {
        wikipedia: WikipediaConfig {
            request_interval_ms: wikipedia.request_interval_ms.min(10_000),
            request_timeout_ms: wikipedia.request_timeout_ms.clamp(500, 120_000),
            timeout_retry_attempts: wikipedia.timeout_retry_attempts.clamp(1, 6),
            ..wikipedia
        },
        sentiment,
        community,
        analysis: AnalysisConfig {
            top_communities: analysis.top_communities.max(1),
            top_terms: analysis.top_terms.max(1),
            max_features: analysis.max_features.max(1),
            max_df: if analysis.max_df.is_finite() {
                analysis.max_df.clamp(0.0, 1.0)
            } else {
                default_max_df()
            },
            ..analysis
        },
        cache: CacheConfig {
            ttl_days: cache.ttl_days.max(1),
            ..cache
        },
    }
}

fn default_true() -> bool {
    true
}

fn default_primary_language() -> String {
    "en".to_string()
}

fn default_fallback_language() -> String {
    "da".to_string()
}

fn default_primary_suffixes() -> Vec<String> {
    ["_(musician)", "_(band)", "_(singer)", "_(American_band)", ""]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_fallback_suffixes() -> Vec<String> {
    ["_(musiker)", "_(band)", "_(sanger)", ""]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_request_interval_ms() -> u64 {
    50
}

fn default_request_timeout_ms() -> u64 {
    7_000
}

fn default_timeout_retry_attempts() -> u32 {
    3
}

fn default_user_agent() -> String {
    "festigraph/0.1.0 (festival ecosystem analysis; batch enrichment)".to_string()
}

fn default_top_communities() -> usize {
    10
}

fn default_top_terms() -> usize {
    10
}

fn default_max_features() -> usize {
    5_000
}

fn default_max_df() -> f64 {
    0.90
}

fn default_cache_ttl_days() -> u32 {
    30
}
