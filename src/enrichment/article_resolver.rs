//! Resolves artist ids to encyclopedia articles across language tiers.
//!
//! Every suffix of the primary tier is tried before any fallback suffix. A
//! fetched page that is a redirect is followed at most `MAX_REDIRECT_HOPS`
//! times in the same language; dictionary stubs count as unresolved.

use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

use super::article_source::ArticleSource;
use crate::config::WikipediaConfig;
use crate::graph::LanguageTier;

/// Redirects followed from a single attempt before giving up.
pub const MAX_REDIRECT_HOPS: usize = 1;

const REDIRECT_SIGILS: [&str; 2] = ["#REDIRECT", "#OMDIRIGERING"];
const DICTIONARY_STUB_MARKERS: [&str; 2] = ["{{wiktionary", "{{Wiktionary"];

static REDIRECT_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("valid redirect target pattern"));

/// One language tier and its ordered title suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTier {
    pub tier: LanguageTier,
    pub language: String,
    pub suffixes: Vec<String>,
}

/// A successfully resolved article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArticle {
    pub text: String,
    pub tier: LanguageTier,
    /// Title the text was read from, after any redirect.
    pub title: String,
}

/// Collapses runs of spaces, hyphens and underscores into a single `_`.
pub fn normalize_title(raw: &str) -> String {
    raw.split([' ', '-', '_'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn is_redirect(text: &str) -> bool {
    let head: String = text.trim_start().chars().take(16).collect();
    let head = head.to_uppercase();
    REDIRECT_SIGILS.iter().any(|sigil| head.starts_with(sigil))
}

/// First `[[...]]` reference of a redirect page, without `|label` or `#section`.
pub fn redirect_target(text: &str) -> Option<String> {
    let captured = REDIRECT_TARGET_RE.captures(text)?.get(1)?.as_str();
    let target = captured.split(['|', '#']).next().unwrap_or_default().trim();
    if target.is_empty() {
        return None;
    }
    Some(target.to_string())
}

pub fn is_dictionary_stub(text: &str) -> bool {
    let trimmed = text.trim_start();
    DICTIONARY_STUB_MARKERS
        .iter()
        .any(|marker| trimmed.starts_with(marker))
}

pub struct ArticleResolver<S> {
    source: S,
    tiers: Vec<LookupTier>,
}

impl<S: ArticleSource> ArticleResolver<S> {
    pub fn new(source: S, tiers: Vec<LookupTier>) -> Self {
        Self { source, tiers }
    }

    pub fn from_config(source: S, config: &WikipediaConfig) -> Self {
        Self::new(
            source,
            vec![
                LookupTier {
                    tier: LanguageTier::Primary,
                    language: config.primary_language.clone(),
                    suffixes: config.primary_suffixes.clone(),
                },
                LookupTier {
                    tier: LanguageTier::Fallback,
                    language: config.fallback_language.clone(),
                    suffixes: config.fallback_suffixes.clone(),
                },
            ],
        )
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Tries every `(tier, suffix)` pair in order and returns the first usable article.
    pub fn resolve(&mut self, entity_id: &str) -> Option<ResolvedArticle> {
        let Self { source, tiers } = self;
        for lookup_tier in tiers.iter() {
            for suffix in &lookup_tier.suffixes {
                let title = normalize_title(&format!("{entity_id}{suffix}"));
                if title.is_empty() {
                    continue;
                }
                if let Some((text, title)) =
                    Self::attempt(source, entity_id, &title, &lookup_tier.language)
                {
                    return Some(ResolvedArticle {
                        text,
                        tier: lookup_tier.tier,
                        title,
                    });
                }
            }
        }
        debug!("Enrichment[artist:{entity_id}]: no article in any language tier");
        None
    }

    /// One lookup plus at most `MAX_REDIRECT_HOPS` redirect follow-ups.
    fn attempt(
        source: &mut S,
        entity_id: &str,
        title: &str,
        language: &str,
    ) -> Option<(String, String)> {
        let mut current = title.to_string();
        for hop in 0..=MAX_REDIRECT_HOPS {
            let text = match source.fetch_article(&current, language) {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!("Enrichment[artist:{entity_id}]: {language}:{current} not found");
                    return None;
                }
                Err(reason) => {
                    warn!(
                        "Enrichment[artist:{entity_id}]: error fetching {current} ({language}): {reason}"
                    );
                    return None;
                }
            };

            if is_redirect(&text) {
                if hop == MAX_REDIRECT_HOPS {
                    debug!(
                        "Enrichment[artist:{entity_id}]: {language}:{current} redirects again, giving up"
                    );
                    return None;
                }
                let Some(target) = redirect_target(&text) else {
                    debug!(
                        "Enrichment[artist:{entity_id}]: {language}:{current} is a redirect without target"
                    );
                    return None;
                };
                info!("Enrichment[artist:{entity_id}]: redirected to {target}");
                current = normalize_title(&target);
                continue;
            }
            if is_dictionary_stub(&text) {
                debug!("Enrichment[artist:{entity_id}]: {language}:{current} is a dictionary stub");
                return None;
            }
            if text.trim().is_empty() {
                return None;
            }
            return Some((text, current));
        }
        None
    }
}
