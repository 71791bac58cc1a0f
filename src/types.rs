use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Gender values accepted by the identities table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
}

/// Coarse popularity class derived from the Wikidata sitelink count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FameTier {
    S,
    A,
    B,
    C,
}

/// Why a record produced no output. Skips are expected and only counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingName,
    EmptySlug,
    AlreadyExists,
    MissingFpid,
    DuplicateFpid,
    Unparseable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::MissingName => "missing name",
            SkipReason::EmptySlug => "empty slug",
            SkipReason::AlreadyExists => "document already exists",
            SkipReason::MissingFpid => "missing fpid",
            SkipReason::DuplicateFpid => "duplicate fpid",
            SkipReason::Unparseable => "unparseable document",
        };
        write!(f, "{}", reason)
    }
}

/// A successfully derived identifier and the parts it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fpid {
    pub id: String,
    pub year: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialHandles {
    pub instagram: Option<String>,
    pub twitter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    pub imdb: Option<String>,
    pub wikidata: Option<String>,
}

/// One outbound relationship as it is written in a document header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEntry {
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<String>,
}

/// Front matter header of a person document. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonFrontmatter {
    pub fpid: String,
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub status: String,
    pub net_worth: Option<u64>,
    pub height_cm: Option<u64>,
    pub birth_date: Option<String>,
    pub country: Vec<String>,
    pub gender: Option<Gender>,
    pub mbti: Option<String>,
    pub zodiac: Option<String>,
    pub occupation: Vec<String>,
    pub social: SocialHandles,
    pub ids: ExternalIds,
    pub sitelinks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia_url: Option<String>,
    pub relationships: Vec<RelationshipEntry>,
    pub ai_summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityMeta {
    pub ids: BTreeMap<String, serde_json::Value>,
}

/// Row upserted into the `identities` table, keyed by `fpid`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub fpid: String,
    pub slug: String,
    pub full_name: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub net_worth: Option<u64>,
    pub height_cm: Option<u64>,
    pub birth_date: Option<String>,
    pub country: Vec<String>,
    pub gender: Option<Gender>,
    pub mbti: Option<String>,
    pub zodiac: Option<String>,
    pub occupation: Vec<String>,
    pub image_url: Option<String>,
    pub wikipedia_url: Option<String>,
    pub bio_summary: String,
    pub content_md: String,
    pub social_links: BTreeMap<String, serde_json::Value>,
    pub meta: IdentityMeta,
    pub sitelinks: u64,
    pub fame_tier: Option<FameTier>,
    pub data_sources: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDetails {
    pub years: serde_json::Value,
}

/// Row inserted into the `relationships` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRow {
    pub source_fpid: String,
    pub target_fpid: String,
    pub relation_type: String,
    pub details: RelationshipDetails,
}

/// A document read back from the vault, ready for the remote store
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub payload: IdentityPayload,
    pub relationships: Vec<RelationshipRow>,
}
