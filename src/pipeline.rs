//! Batch stages wired from configuration: build, enrich, analyze.

use std::path::Path;

use log::{info, warn};

use crate::community::{corpus, louvain, term_ranking};
use crate::config::Config;
use crate::enrichment::article_cache::{ArticleCache, CachedArticleSource};
use crate::enrichment::article_resolver::ArticleResolver;
use crate::enrichment::article_source::{ArticleSource, WikipediaClient};
use crate::enrichment::graph_enricher::{enrich_graph, purge_fallback_articles, EnrichmentSummary};
use crate::festival_import::{build_festival_graph, load_pairs};
use crate::graph::FestivalGraph;
use crate::report::{summarize_communities, CommunityReport, TermWeight};
use crate::sentiment::SentimentScorer;

pub fn build(pairs_path: &Path) -> Result<FestivalGraph, String> {
    let pairs = load_pairs(pairs_path)?;
    info!("Loaded {} festival/artist pairs", pairs.len());
    Ok(build_festival_graph(&pairs))
}

pub fn load_scorer(config: &Config) -> Result<SentimentScorer, String> {
    SentimentScorer::load(
        config.sentiment.primary_lexicon_path.as_deref(),
        config.sentiment.fallback_lexicon_path.as_deref(),
        config.sentiment.filter_with_primary_lexicon,
    )
}

/// Opens the on-disk article cache when enabled and a location is known.
pub fn open_article_cache(config: &Config) -> Result<Option<ArticleCache>, String> {
    if !config.cache.enabled {
        return Ok(None);
    }
    let Some(path) = config.cache.resolved_path() else {
        warn!("No cache directory available; article cache disabled");
        return Ok(None);
    };
    let cache = ArticleCache::open(&path, config.cache.ttl_days)?;
    info!("Using article cache at {}", path.display());
    Ok(Some(cache))
}

pub fn enrich_with_source<S: ArticleSource>(
    graph: FestivalGraph,
    source: S,
    scorer: &SentimentScorer,
    config: &Config,
) -> (FestivalGraph, EnrichmentSummary) {
    let mut resolver = ArticleResolver::from_config(source, &config.wikipedia);
    enrich_graph(graph, &mut resolver, scorer)
}

/// Enriches through `source` and logs how many lookups the cache answered.
pub fn enrich_with_cache<S: ArticleSource>(
    graph: FestivalGraph,
    source: &mut CachedArticleSource<S>,
    scorer: &SentimentScorer,
    config: &Config,
) -> (FestivalGraph, EnrichmentSummary) {
    let enriched = enrich_with_source(graph, &mut *source, scorer, config);
    info!(
        "Article cache: {} hits, {} misses",
        source.hits(),
        source.misses()
    );
    enriched
}

/// Live encyclopedia enrichment, through the article cache when enabled.
pub fn enrich(
    graph: FestivalGraph,
    config: &Config,
) -> Result<(FestivalGraph, EnrichmentSummary), String> {
    let scorer = load_scorer(config)?;
    let client = WikipediaClient::new(&config.wikipedia);
    Ok(match open_article_cache(config)? {
        Some(cache) => {
            let mut source = CachedArticleSource::new(client, cache);
            enrich_with_cache(graph, &mut source, &scorer, config)
        }
        None => enrich_with_source(graph, client, &scorer, config),
    })
}

/// Command-line seed, then configured seed, then a fresh logged one.
pub fn resolve_seed(cli_seed: Option<u64>, config: &Config) -> u64 {
    if let Some(seed) = cli_seed.or(config.community.seed) {
        return seed;
    }
    let seed = louvain::entropy_seed();
    info!("No community seed configured; using {seed}");
    seed
}

/// Detects communities, summarizes the largest ones and ranks their terms.
///
/// When fallback purging is enabled the graph is modified in place after the
/// summaries are taken.
pub fn analyze(
    graph: &mut FestivalGraph,
    scorer: &SentimentScorer,
    config: &Config,
    seed: u64,
) -> CommunityReport {
    let analysis = &config.analysis;
    let partition = louvain::detect_communities(graph, seed);
    info!(
        "Detected {} communities, modularity {:.4}",
        partition.communities.len(),
        partition.modularity
    );
    let ranked = louvain::rank_by_size(graph, &partition);
    let mut summaries = summarize_communities(graph, &ranked, analysis.top_communities);

    if analysis.purge_fallback_text {
        let purged = purge_fallback_articles(graph, scorer);
        info!("Purged {purged} fallback-language articles before term ranking");
    }

    let documents = corpus::aggregate(graph, &ranked, analysis.top_communities);
    let mut rankings = term_ranking::rank_terms(
        &documents,
        analysis.top_terms,
        analysis.max_features,
        analysis.max_df,
    );
    for summary in &mut summaries {
        summary.top_terms = rankings
            .remove(&summary.rank)
            .unwrap_or_default()
            .into_iter()
            .map(|(term, weight)| TermWeight { term, weight })
            .collect();
    }

    CommunityReport {
        seed,
        modularity: partition.modularity,
        community_count: partition.communities.len(),
        communities: summaries,
    }
}
