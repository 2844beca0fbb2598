//! Request id, bearer auth and rate limiting for the HTTP surface.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id stored as a request extension and echoed on the response.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Uses the caller's `x-request-id` when it is short printable ASCII,
    /// otherwise mints a UUIDv4.
    fn from_header(value: Option<&HeaderValue>) -> Self {
        let supplied = value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN);
        Self(supplied.map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned))
    }

    fn of(req: &Request) -> String {
        req.extensions()
            .get::<Self>()
            .map_or_else(String::new, |id| id.0.clone())
    }
}

/// Bearer tokens accepted on the pipeline routes.
#[derive(Clone)]
pub struct AuthState {
    tokens: Arc<[String]>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("tokens", &format!("[{} redacted]", self.tokens.len()))
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AuthState {
    /// Builds auth settings from the configured `DEALDB_API_KEYS`.
    ///
    /// An empty list turns auth off in development and is a startup error
    /// in every other environment.
    ///
    /// # Errors
    ///
    /// Returns an error when no usable token is configured outside
    /// development.
    pub fn from_keys(keys: &[String], is_development: bool) -> anyhow::Result<Self> {
        let tokens: Vec<String> = keys
            .iter()
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty())
            .collect();

        match (tokens.is_empty(), is_development) {
            (true, true) => {
                tracing::warn!("DEALDB_API_KEYS is empty; pipeline routes are unauthenticated");
                Ok(Self {
                    tokens: Arc::from(Vec::new()),
                    enabled: false,
                })
            }
            (true, false) => anyhow::bail!(
                "DEALDB_API_KEYS must list at least one bearer token outside development"
            ),
            (false, _) => Ok(Self {
                tokens: Arc::from(tokens),
                enabled: true,
            }),
        }
    }

    /// Checks `candidate` against every token without short-circuiting.
    fn accepts(&self, candidate: &str) -> bool {
        self.tokens
            .iter()
            .map(|token| token.as_bytes().ct_eq(candidate.as_bytes()))
            .fold(subtle::Choice::from(0), |acc, eq| acc | eq)
            .into()
    }
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    used: usize,
}

/// Fixed-window request limiter shared by all protected routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    limit: usize,
    period: Duration,
    window: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(limit: usize, period: Duration) -> Self {
        Self {
            limit,
            period,
            window: Arc::new(Mutex::new(Window {
                opened_at: Instant::now(),
                used: 0,
            })),
        }
    }

    /// Takes one slot from the current window, or returns how long until the
    /// next window opens.
    async fn take(&self) -> Result<(), Duration> {
        let mut window = self.window.lock().await;
        let age = window.opened_at.elapsed();
        if age >= self.period {
            window.opened_at = Instant::now();
            window.used = 0;
        } else if window.used >= self.limit {
            return Err(self.period.saturating_sub(age));
        }
        window.used += 1;
        Ok(())
    }
}

/// Resolves the request id before anything else runs and echoes it back.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_header(req.headers().get(REQUEST_ID_HEADER));
    let echoed = HeaderValue::from_str(&id.0).ok();
    req.extensions_mut().insert(id);

    let mut res = next.run(req).await;
    if let Some(value) = echoed {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Rejects requests without an accepted bearer token while auth is enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let accepted = bearer_token(req.headers().get(header::AUTHORIZATION))
        .is_some_and(|token| auth.accepts(token));
    if accepted {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "rejected request without valid bearer token");
    ApiError::new(
        RequestId::of(&req),
        ErrorCode::Unauthorized,
        "missing or invalid bearer token",
    )
    .into_response()
}

/// Answers `429` with `retry-after` once the current window is used up.
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    match limiter.take().await {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            let mut res =
                ApiError::new(RequestId::of(&req), ErrorCode::RateLimited, "rate limit exceeded")
                    .into_response();
            let secs = wait.as_secs().max(1);
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            res
        }
    }
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
