//! In-memory store and scripted clients for stage tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dealdb_ai::AiError;
use dealdb_core::{EmbeddingCandidate, InsertOutcome, NewDeal, NewRawDeal, RawDeal, SourcePost};
use dealdb_db::{DbError, DealStore};
use dealdb_pipeline::{ContentSource, Embedder, Extractor};
use dealdb_sources::SourceError;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredDeal {
    pub id: i64,
    pub external_id: String,
    pub original_title: String,
    pub is_sale: bool,
    pub low_quality: bool,
    pub professional_summary: Option<String>,
    pub other_important_stuff: Option<String>,
    pub monthly_revenue: Option<String>,
    pub asking_price: Option<String>,
    pub user_count: Option<String>,
    pub link: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub embedding_attempts: u32,
    /// Tick of the last failed embedding attempt; `None` sorts first.
    pub attempted_at: Option<u64>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    clock: u64,
    raw: Vec<RawDeal>,
    deals: Vec<StoredDeal>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// [`DealStore`] over two vectors, insertion order preserved.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    fail_set_embedding_for: Mutex<Option<i64>>,
}

fn unreachable_db() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails as if the database were unreachable.
    pub fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub fn fail_set_embedding(&self, id: i64) {
        *self.fail_set_embedding_for.lock().unwrap() = Some(id);
    }

    fn check(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unreachable_db())
        } else {
            Ok(())
        }
    }

    pub fn seed_raw(&self, external_id: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.raw.push(RawDeal {
            id,
            external_id: external_id.to_string(),
            title: format!("Title {external_id}"),
            body_text: body.to_string(),
            url: format!("https://reddit.com/r/x/comments/{external_id}"),
            score: 1,
            source: "x".to_string(),
            images: vec![],
            processed: false,
            created_at: Utc::now(),
        });
    }

    /// Inserts a deal directly, bypassing extraction.
    pub fn seed_deal(&self, external_id: &str, summary: Option<&str>, other: Option<&str>) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.deals.push(StoredDeal {
            id,
            external_id: external_id.to_string(),
            original_title: format!("Title {external_id}"),
            is_sale: true,
            low_quality: false,
            professional_summary: summary.map(str::to_string),
            other_important_stuff: other.map(str::to_string),
            monthly_revenue: None,
            asking_price: None,
            user_count: None,
            link: vec![],
            embedding: None,
            embedding_attempts: 0,
            attempted_at: None,
        });
        id
    }

    pub fn raw(&self, external_id: &str) -> Option<RawDeal> {
        let state = self.state.lock().unwrap();
        state.raw.iter().find(|r| r.external_id == external_id).cloned()
    }

    pub fn raw_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.raw.iter().map(|r| r.external_id.clone()).collect()
    }

    pub fn deal(&self, external_id: &str) -> Option<StoredDeal> {
        let state = self.state.lock().unwrap();
        state.deals.iter().find(|d| d.external_id == external_id).cloned()
    }

    pub fn deal_count(&self) -> usize {
        self.state.lock().unwrap().deals.len()
    }
}

#[async_trait]
impl DealStore for MemoryStore {
    async fn raw_exists(&self, external_id: &str) -> Result<bool, DbError> {
        self.check()?;
        Ok(self.raw(external_id).is_some())
    }

    async fn raw_insert(&self, deal: &NewRawDeal) -> Result<InsertOutcome, DbError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.raw.iter().any(|r| r.external_id == deal.external_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        let id = state.next_id();
        state.raw.push(RawDeal {
            id,
            external_id: deal.external_id.clone(),
            title: deal.title.clone(),
            body_text: deal.body_text.clone(),
            url: deal.url.clone(),
            score: deal.score,
            source: deal.source.clone(),
            images: deal.images.clone(),
            processed: false,
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn raw_count_unprocessed(&self) -> Result<i64, DbError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.raw.iter().filter(|r| !r.processed).count() as i64)
    }

    async fn raw_select_unprocessed(&self, limit: i64) -> Result<Vec<RawDeal>, DbError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .raw
            .iter()
            .filter(|r| !r.processed)
            .take(usize::try_from(limit).unwrap())
            .cloned()
            .collect())
    }

    async fn raw_mark_processed(&self, external_id: &str) -> Result<(), DbError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(raw) = state.raw.iter_mut().find(|r| r.external_id == external_id) {
            raw.processed = true;
        }
        Ok(())
    }

    async fn raw_count_processed(&self) -> Result<i64, DbError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.raw.iter().filter(|r| r.processed).count() as i64)
    }

    async fn raw_delete_processed(&self) -> Result<u64, DbError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let before = state.raw.len();
        state.raw.retain(|r| !r.processed);
        Ok((before - state.raw.len()) as u64)
    }

    async fn raw_count_all(&self) -> Result<i64, DbError> {
        self.check()?;
        Ok(self.state.lock().unwrap().raw.len() as i64)
    }

    async fn deal_create(&self, deal: &NewDeal) -> Result<InsertOutcome, DbError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.deals.iter().any(|d| d.external_id == deal.external_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        let id = state.next_id();
        state.deals.push(StoredDeal {
            id,
            external_id: deal.external_id.clone(),
            original_title: deal.original_title.clone(),
            is_sale: deal.is_sale,
            low_quality: deal.low_quality,
            professional_summary: Some(deal.professional_summary.clone()),
            other_important_stuff: Some(deal.other_important_stuff.clone()),
            monthly_revenue: deal.monthly_revenue.clone(),
            asking_price: deal.asking_price.clone(),
            user_count: deal.user_count.clone(),
            link: deal.link.clone(),
            embedding: None,
            embedding_attempts: 0,
            attempted_at: None,
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn deal_select_missing_embedding(
        &self,
        limit: i64,
    ) -> Result<Vec<EmbeddingCandidate>, DbError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let mut pending: Vec<&StoredDeal> =
            state.deals.iter().filter(|d| d.embedding.is_none()).collect();
        pending.sort_by_key(|d| d.attempted_at);
        Ok(pending
            .into_iter()
            .filter_map(|d| {
                Some(EmbeddingCandidate {
                    id: d.id,
                    external_id: d.external_id.clone(),
                    original_title: d.original_title.clone(),
                    professional_summary: d.professional_summary.clone()?,
                    other_important_stuff: d.other_important_stuff.clone()?,
                    monthly_revenue: d.monthly_revenue.clone(),
                    asking_price: d.asking_price.clone(),
                    user_count: d.user_count.clone(),
                })
            })
            .take(usize::try_from(limit).unwrap())
            .collect())
    }

    async fn deal_set_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool, DbError> {
        self.check()?;
        if *self.fail_set_embedding_for.lock().unwrap() == Some(id) {
            return Err(unreachable_db());
        }
        let mut state = self.state.lock().unwrap();
        match state.deals.iter_mut().find(|d| d.id == id) {
            Some(deal) if deal.embedding.is_none() => {
                deal.embedding = Some(embedding.to_vec());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deal_record_embedding_failure(&self, id: i64) -> Result<(), DbError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let tick = state.clock;
        if let Some(deal) = state
            .deals
            .iter_mut()
            .find(|d| d.id == id && d.embedding.is_none())
        {
            deal.embedding_attempts += 1;
            deal.attempted_at = Some(tick);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

pub fn post(external_id: &str, body: &str) -> SourcePost {
    SourcePost {
        external_id: external_id.to_string(),
        title: format!("Title {external_id}"),
        body_text: body.to_string(),
        permalink_url: format!("https://reddit.com/r/x/comments/{external_id}"),
        score: 10,
        images: vec![],
    }
}

/// Serves a fixed feed per source name; unknown sources answer 503.
#[derive(Default)]
pub struct FakeSource {
    feeds: HashMap<String, Vec<SourcePost>>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_feed(mut self, source: &str, posts: Vec<SourcePost>) -> Self {
        self.feeds.insert(source.to_string(), posts);
        self
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn fetch_top(
        &self,
        source: &str,
        limit: u32,
        _period: &str,
    ) -> Result<Vec<SourcePost>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.feeds.get(source) {
            Some(posts) => Ok(posts.iter().take(limit as usize).cloned().collect()),
            None => Err(SourceError::Status {
                status: 503,
                url: format!("https://www.reddit.com/r/{source}/top.json"),
            }),
        }
    }
}

/// Replies with queued results in order; `None` once the script runs out.
#[derive(Default)]
pub struct ScriptedExtractor {
    replies: Mutex<VecDeque<Option<Value>>>,
    pub calls: AtomicUsize,
    pub titles: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new(replies: Vec<Option<Value>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, title: &str, _body: &str) -> Option<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.titles.lock().unwrap().push(title.to_string());
        self.replies.lock().unwrap().pop_front().flatten()
    }
}

/// Returns a constant vector, failing for texts that contain `fail_on`.
pub struct FakeEmbedder {
    pub dimensions: usize,
    pub fail_on: Option<String>,
    pub texts: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_on: None,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail_on.as_deref().is_some_and(|needle| text.contains(needle)) {
            return Err(AiError::RateLimited);
        }
        Ok(vec![0.5; self.dimensions])
    }
}
