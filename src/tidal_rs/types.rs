use serde::{Deserialize, Serialize};

/* ---------- JSON:API envelope ---------- */

#[derive(Debug, Clone, Deserialize)]
pub struct TidalDocument<T> {
    pub data: T,
    #[serde(default)]
    pub included: Vec<TidalResource>,
    #[serde(default)]
    pub links: Option<TidalLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TidalLinks {
    #[serde(default)]
    pub next: Option<String>,
}

/* ---------- Resources ---------- */

#[derive(Debug, Clone, Deserialize)]
pub struct TidalResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: TidalAttributes,
    #[serde(default)]
    pub relationships: TidalRelationships,
}

/// Union of the attributes used from `playlists`, `tracks`, `artists` and `albums` resources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TidalAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TidalRelationships {
    #[serde(default)]
    pub artists: Option<TidalRelationship>,
    #[serde(default)]
    pub albums: Option<TidalRelationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TidalRelationship {
    #[serde(default)]
    pub data: Option<TidalLinkage>,
}

impl TidalRelationship {
    pub fn first_id(&self) -> Option<&str> {
        match self.data.as_ref()? {
            TidalLinkage::One(identifier) => Some(&identifier.id),
            TidalLinkage::Many(identifiers) => identifiers.first().map(|i| i.id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TidalLinkage {
    One(TidalIdentifier),
    Many(Vec<TidalIdentifier>),
}

/// Resource identifier object, as found in relationship `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidalIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TidalItemMeta>,
}

impl TidalIdentifier {
    pub fn track(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "tracks".to_string(),
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalItemMeta {
    pub item_id: Option<String>,
}

/// One entry of a playlist: the track linkage plus its playlist-local item id, which deletion
/// requires.
#[derive(Debug, Clone)]
pub struct TidalPlaylistItem {
    pub track_id: String,
    pub item_id: Option<String>,
    pub track: Option<TidalResource>,
}
