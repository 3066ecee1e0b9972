pub mod article_cache;
pub mod article_resolver;
pub mod article_source;
pub mod graph_enricher;
