//! Bipartite festival/artist graph and its node-link JSON form.
//!
//! The on-disk shape matches networkx `node_link_data`: a `nodes` list whose
//! entries carry an `id` plus arbitrary attributes, and a `links` (or `edges`)
//! list of `source`/`target` pairs. Attributes this crate does not know about
//! are carried through untouched.

use std::collections::HashMap;
use std::path::Path;

use serde::ser::SerializeMap;
use serde_json::{Map, Value};

/// Vertex type stored in the `bipartite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Artist,
    FestivalYear,
}

/// Which lookup tier produced an artist's article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum LanguageTier {
    #[serde(rename = "primary", alias = "en")]
    Primary,
    #[serde(rename = "fallback", alias = "da")]
    Fallback,
}

impl LanguageTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// One vertex. Artists always carry the enrichment attributes, with absent
/// values written as explicit `null`; other vertices only keep the ones set.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "bipartite", default)]
    pub kind: Option<NodeKind>,
    #[serde(default, alias = "wikitext")]
    pub article_text: Option<String>,
    #[serde(default, alias = "wiki_language")]
    pub source_language: Option<LanguageTier>,
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn is_artist(&self) -> bool {
        self.kind == Some(NodeKind::Artist)
    }

    pub fn is_festival(&self) -> bool {
        self.kind == Some(NodeKind::FestivalYear)
    }
}

impl serde::Serialize for GraphNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        if let Some(kind) = self.kind {
            map.serialize_entry("bipartite", &kind)?;
        }
        let artist = self.is_artist();
        if artist || self.article_text.is_some() {
            map.serialize_entry("article_text", &self.article_text)?;
        }
        if artist || self.source_language.is_some() {
            map.serialize_entry("source_language", &self.source_language)?;
        }
        if artist || self.sentiment.is_some() {
            map.serialize_entry("sentiment", &self.sentiment)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Undirected link between two vertex ids.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            extra: Map::new(),
        }
    }
}

/// Festival ecosystem graph owned by exactly one pipeline stage at a time.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct FestivalGraph {
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub multigraph: bool,
    #[serde(default)]
    pub graph: Map<String, Value>,
    pub nodes: Vec<GraphNode>,
    #[serde(default, alias = "edges")]
    pub links: Vec<GraphLink>,
}

impl FestivalGraph {
    pub fn from_json_str(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|err| format!("Invalid node-link graph JSON: {err}"))
    }

    pub fn to_json_string(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| format!("Failed to serialize graph: {err}"))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("Failed to read graph {}: {}", path.display(), err))?;
        Self::from_json_str(&text).map_err(|err| format!("{}: {}", path.display(), err))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let text = self.to_json_string()?;
        std::fs::write(path, text)
            .map_err(|err| format!("Failed to write graph {}: {}", path.display(), err))
    }

    /// Maps vertex id to its position in `nodes`. Later duplicates are ignored.
    pub fn index_by_id(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (position, node) in self.nodes.iter().enumerate() {
            index.entry(node.id.as_str()).or_insert(position);
        }
        index
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn artist_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_artist()).count()
    }
}
