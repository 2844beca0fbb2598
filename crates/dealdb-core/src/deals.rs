//! Raw and structured deal records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as returned by a content source, before it becomes a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePost {
    pub external_id: String,
    pub title: String,
    pub body_text: String,
    pub permalink_url: String,
    pub score: i64,
    pub images: Vec<String>,
}

impl SourcePost {
    /// A post whose body is empty or whitespace-only carries no business signal.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body_text.trim().is_empty()
    }
}

/// Insert payload for the raw store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRawDeal {
    pub external_id: String,
    pub title: String,
    pub body_text: String,
    pub url: String,
    pub score: i64,
    pub source: String,
    pub images: Vec<String>,
}

impl NewRawDeal {
    #[must_use]
    pub fn from_post(source: &str, post: SourcePost) -> Self {
        Self {
            external_id: post.external_id,
            title: post.title,
            body_text: post.body_text,
            url: post.permalink_url,
            score: post.score,
            source: source.to_string(),
            images: post.images,
        }
    }
}

/// An ingested, unvalidated post awaiting extraction.
///
/// `processed` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeal {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub body_text: String,
    pub url: String,
    pub score: i64,
    pub source: String,
    pub images: Vec<String>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields that passed the validation gate.
///
/// `professional_summary` and `other_important_stuff` are guaranteed
/// non-blank by construction in the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub is_sale: bool,
    pub low_quality: bool,
    pub professional_summary: String,
    pub monthly_revenue: Option<String>,
    pub asking_price: Option<String>,
    pub user_count: Option<String>,
    pub link: Vec<String>,
    pub other_important_stuff: String,
}

/// Insert payload for the structured store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeal {
    pub external_id: String,
    pub original_title: String,
    pub url: String,
    pub score: i64,
    pub source: String,
    pub images: Vec<String>,
    pub is_sale: bool,
    pub low_quality: bool,
    pub professional_summary: String,
    pub monthly_revenue: Option<String>,
    pub asking_price: Option<String>,
    pub user_count: Option<String>,
    pub link: Vec<String>,
    pub other_important_stuff: String,
}

impl NewDeal {
    /// Snapshot the raw record's source fields and merge the extracted ones.
    #[must_use]
    pub fn promote(raw: &RawDeal, fields: ExtractedFields) -> Self {
        Self {
            external_id: raw.external_id.clone(),
            original_title: raw.title.clone(),
            url: raw.url.clone(),
            score: raw.score,
            source: raw.source.clone(),
            images: raw.images.clone(),
            is_sale: fields.is_sale,
            low_quality: fields.low_quality,
            professional_summary: fields.professional_summary,
            monthly_revenue: fields.monthly_revenue,
            asking_price: fields.asking_price,
            user_count: fields.user_count,
            link: fields.link,
            other_important_stuff: fields.other_important_stuff,
        }
    }
}

/// Outcome of a unique-keyed insert. A duplicate key is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Projection of a deal that still needs an embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingCandidate {
    pub id: i64,
    pub external_id: String,
    pub original_title: String,
    pub professional_summary: String,
    pub other_important_stuff: String,
    pub monthly_revenue: Option<String>,
    pub asking_price: Option<String>,
    pub user_count: Option<String>,
}
