//! Lexicon-based sentiment scoring of artist articles.
//!
//! Scores are AFINN-style word polarities in `[-5, 5]`. A text's score is the
//! mean of its strongly polar tokens shifted into `[0, 10]`, or `None` when no
//! token qualifies.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use crate::graph::LanguageTier;

const MAX_ABS_POLARITY: f64 = 5.0;
/// Tokens with `|polarity| <= 1` are treated as neutral noise.
const POLARITY_FILTER_THRESHOLD: f64 = 1.0;
/// Shifts `[-5, 5]` onto `[0, 10]`.
const RESCALE_OFFSET: f64 = 5.0;

const BUNDLED_PRIMARY_LEXICON: &str = include_str!("../lexicons/afinn_en.tsv");
const BUNDLED_FALLBACK_LEXICON: &str = include_str!("../lexicons/afinn_da.tsv");

static PRIMARY_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+").expect("valid primary token pattern"));
// Latin-1 lowercase letters, which covers æ, ø and å.
static EXTENDED_LATIN_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zà-öø-ÿ]+").expect("valid extended latin token pattern")
});

/// Immutable word to polarity mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lexicon {
    scores: HashMap<String, f64>,
}

impl Lexicon {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let scores = entries
            .into_iter()
            .map(|(word, score)| {
                (
                    word.into().to_lowercase(),
                    score.clamp(-MAX_ABS_POLARITY, MAX_ABS_POLARITY),
                )
            })
            .collect();
        Self { scores }
    }

    /// Parses `word<TAB>score` lines. Blank lines and `#` comments are ignored;
    /// malformed lines are skipped with a warning.
    pub fn from_tsv_str(text: &str, origin: &str) -> Self {
        let mut entries = Vec::new();
        for (line_number, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((word, score)) = trimmed.rsplit_once('\t') else {
                warn!(
                    "Lexicon {}: line {} has no tab separator, skipping",
                    origin,
                    line_number + 1
                );
                continue;
            };
            match score.trim().parse::<f64>() {
                Ok(score) if score.is_finite() => entries.push((word.trim().to_string(), score)),
                _ => warn!(
                    "Lexicon {}: line {} has invalid score {:?}, skipping",
                    origin,
                    line_number + 1,
                    score
                ),
            }
        }
        Self::from_entries(entries)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("Failed to read lexicon {}: {}", path.display(), err))?;
        let lexicon = Self::from_tsv_str(&text, &path.display().to_string());
        if lexicon.is_empty() {
            warn!("Lexicon {} has no usable entries", path.display());
        }
        debug!("Loaded {} lexicon entries from {}", lexicon.len(), path.display());
        Ok(lexicon)
    }

    /// Lexicon compiled into the binary for `tier`.
    pub fn bundled(tier: LanguageTier) -> Self {
        let text = match tier {
            LanguageTier::Primary => BUNDLED_PRIMARY_LEXICON,
            LanguageTier::Fallback => BUNDLED_FALLBACK_LEXICON,
        };
        Self::from_tsv_str(text, &format!("bundled {}", tier.label()))
    }

    /// Reads `path` when given, otherwise uses the bundled lexicon for `tier`.
    pub fn load_or_bundled(path: Option<&Path>, tier: LanguageTier) -> Result<Self, String> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::bundled(tier)),
        }
    }

    /// Polarity of `word`, zero when absent.
    pub fn polarity(&self, word: &str) -> f64 {
        self.scores.get(word).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Lowercases and splits text into maximal alphabetic runs for the tier's alphabet.
pub fn tokenize(text: &str, tier: LanguageTier) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let lowered = text.to_lowercase();
    let pattern = match tier {
        LanguageTier::Primary => &*PRIMARY_TOKEN_RE,
        LanguageTier::Fallback => &*EXTENDED_LATIN_TOKEN_RE,
    };
    pattern
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}

/// Scores article text against one lexicon per language tier.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    primary: Lexicon,
    fallback: Lexicon,
    filter_with_primary_lexicon: bool,
}

impl SentimentScorer {
    /// `filter_with_primary_lexicon` keeps the neutral-token filter on primary
    /// lexicon polarities for every tier; `false` filters each tier by its own.
    pub fn new(primary: Lexicon, fallback: Lexicon, filter_with_primary_lexicon: bool) -> Self {
        Self {
            primary,
            fallback,
            filter_with_primary_lexicon,
        }
    }

    /// Unset paths fall back to the bundled lexicons.
    pub fn load(
        primary_path: Option<&Path>,
        fallback_path: Option<&Path>,
        filter_with_primary_lexicon: bool,
    ) -> Result<Self, String> {
        Ok(Self::new(
            Lexicon::load_or_bundled(primary_path, LanguageTier::Primary)?,
            Lexicon::load_or_bundled(fallback_path, LanguageTier::Fallback)?,
            filter_with_primary_lexicon,
        ))
    }

    fn lexicon_for(&self, tier: LanguageTier) -> &Lexicon {
        match tier {
            LanguageTier::Primary => &self.primary,
            LanguageTier::Fallback => &self.fallback,
        }
    }

    /// Mean rescaled polarity of the qualifying tokens, in `[0, 10]`.
    pub fn score(&self, text: &str, tier: LanguageTier) -> Option<f64> {
        let lexicon = self.lexicon_for(tier);
        let filter_lexicon = if self.filter_with_primary_lexicon {
            &self.primary
        } else {
            lexicon
        };

        let rescaled: Vec<f64> = tokenize(text, tier)
            .iter()
            .filter(|token| filter_lexicon.polarity(token).abs() > POLARITY_FILTER_THRESHOLD)
            .map(|token| lexicon.polarity(token) + RESCALE_OFFSET)
            .collect();

        if rescaled.is_empty() {
            return None;
        }
        Some(rescaled.iter().sum::<f64>() / rescaled.len() as f64)
    }

    /// Scores a possibly unresolved article; absent text or tier yields `None`.
    pub fn score_article(&self, text: Option<&str>, tier: Option<LanguageTier>) -> Option<f64> {
        match (text, tier) {
            (Some(text), Some(tier)) => self.score(text, tier),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{tokenize, Lexicon, SentimentScorer};
    use crate::graph::LanguageTier;

    fn english() -> Lexicon {
        Lexicon::from_entries([
            ("good", 3.0),
            ("great", 3.0),
            ("bad", -3.0),
            ("ok", 1.0),
            ("like", 2.0),
            ("awful", -5.0),
        ])
    }

    fn danish() -> Lexicon {
        Lexicon::from_entries([("god", 3.0), ("dårlig", -3.0), ("like", -2.0)])
    }

    #[test]
    fn test_tokenize_lowercases_and_splits_on_non_letters() {
        assert_eq!(
            tokenize("Great band, GOOD-vibes 1971!", LanguageTier::Primary),
            vec!["great", "band", "good", "vibes"]
        );
        assert!(tokenize("", LanguageTier::Primary).is_empty());
    }

    #[test]
    fn test_tokenize_fallback_keeps_extended_latin_letters() {
        assert_eq!(
            tokenize("Dårlig Økonomi på Roskilde", LanguageTier::Fallback),
            vec!["dårlig", "økonomi", "på", "roskilde"]
        );
        assert_eq!(
            tokenize("Dårlig", LanguageTier::Primary),
            vec!["d", "rlig"]
        );
    }

    #[test]
    fn test_score_returns_mean_of_rescaled_polar_tokens() {
        let scorer = SentimentScorer::new(english(), danish(), true);
        // good (+3) and bad (-3) survive, ok (+1) is filtered out.
        let score = scorer
            .score("good ok bad", LanguageTier::Primary)
            .expect("polar tokens present");
        assert!((score - 5.0).abs() < 1e-9);

        let score = scorer
            .score("great great awful", LanguageTier::Primary)
            .expect("polar tokens present");
        assert!((score - (8.0 + 8.0 + 0.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_none_for_empty_or_neutral_text() {
        let scorer = SentimentScorer::new(english(), danish(), true);
        assert_eq!(scorer.score("", LanguageTier::Primary), None);
        assert_eq!(scorer.score("ok ok band", LanguageTier::Primary), None);
        assert_eq!(scorer.score_article(None, Some(LanguageTier::Primary)), None);
        assert_eq!(scorer.score_article(Some("good"), None), None);
    }

    #[test]
    fn test_score_stays_within_bounds_and_is_deterministic() {
        let scorer = SentimentScorer::new(english(), danish(), true);
        let text = "awful awful great like bad good good unknown";
        let first = scorer.score(text, LanguageTier::Primary).expect("scored");
        let second = scorer.score(text, LanguageTier::Primary).expect("scored");
        assert!((0.0..=10.0).contains(&first));
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_fallback_text_is_filtered_with_primary_lexicon_by_default() {
        let scorer = SentimentScorer::new(english(), danish(), true);
        // "god" is absent from the primary lexicon, so it is filtered out even
        // though the fallback lexicon rates it +3. "like" passes the primary
        // filter and is scored with the fallback value -2.
        assert_eq!(scorer.score("god", LanguageTier::Fallback), None);
        let score = scorer
            .score("god like", LanguageTier::Fallback)
            .expect("like survives the primary filter");
        assert!((score - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_text_uses_own_lexicon_when_filter_switch_is_off() {
        let scorer = SentimentScorer::new(english(), danish(), false);
        let score = scorer
            .score("god dårlig", LanguageTier::Fallback)
            .expect("both tokens are polar in the fallback lexicon");
        assert!((score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_lexicon_from_tsv_skips_malformed_lines_and_clamps() {
        let lexicon = Lexicon::from_tsv_str(
            "# comment\nabandon\t-2\nbroken line\nsuperb\t9\nnan\tabc\n\nCool\t1\n",
            "inline",
        );
        assert_eq!(lexicon.len(), 3);
        assert_eq!(lexicon.polarity("abandon"), -2.0);
        assert_eq!(lexicon.polarity("superb"), 5.0);
        assert_eq!(lexicon.polarity("cool"), 1.0);
        assert_eq!(lexicon.polarity("missing"), 0.0);
    }

    #[test]
    fn test_bundled_lexicons_load_without_files() {
        let primary = Lexicon::bundled(LanguageTier::Primary);
        let fallback = Lexicon::bundled(LanguageTier::Fallback);

        assert!(!primary.is_empty());
        assert!(!fallback.is_empty());
        assert_eq!(primary.polarity("great"), 3.0);
        assert_eq!(fallback.polarity("dårlig"), -3.0);
    }

    #[test]
    fn test_scorer_load_uses_bundled_lexicons_for_unset_paths() {
        let scorer = SentimentScorer::load(None, None, true).expect("bundled lexicons load");

        let score = scorer
            .score("a great and brilliant band", LanguageTier::Primary)
            .expect("bundled lexicon rates both words");
        assert!((score - 8.5).abs() < 1e-9);
    }

    #[test]
    fn test_scorer_load_reports_missing_configured_lexicon() {
        let missing = std::env::temp_dir().join("festigraph-no-such-lexicon.tsv");

        let err = SentimentScorer::load(Some(&missing), None, true)
            .expect_err("configured lexicon must exist");

        assert!(err.starts_with("Failed to read lexicon"));
    }
}
