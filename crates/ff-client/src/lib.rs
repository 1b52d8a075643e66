//! LaunchDarkly audit-log API client.
//!
//! Pages through `/api/v2/auditlog` newest first, following the `next` link
//! until the cutoff date is reached, and normalizes each entry into a
//! [`RawAuditEvent`].

use std::fmt;
use std::time::Duration;

use ff_core::{AuditAction, AuditLogEntry, RawAuditEvent};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const AUDIT_LOG_PATH: &str = "/api/v2/auditlog";

/// Default base URL of the API and web UI.
pub const DEFAULT_BASE_URL: &str = "https://app.launchdarkly.com";

/// Default number of entries per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Audit-log client errors.
#[derive(Debug, Error)]
pub enum AuditLogError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The API rejected the credentials.
    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    /// The API rate limit was hit.
    #[error("rate limited{}", .retry_after.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },
    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Audit-log API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key and base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, AuditLogError> {
        let api_key = api_key.into();

        if api_key.is_empty() {
            return Err(AuditLogError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(AuditLogError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(AuditLogError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Starts paging through entries matching `query`.
    pub fn pager(&self, query: AuditLogQuery) -> AuditLogPager<'_> {
        AuditLogPager {
            client: self,
            query,
            next_href: None,
            started: false,
            done: false,
        }
    }

    async fn fetch_page(
        &self,
        url: &str,
        params: &[(&str, String)],
        body: &[PolicyStatement],
    ) -> Result<AuditLogPage, AuditLogError> {
        let response = self
            .http
            .post(url)
            .query(params)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body, retry_after));
        }

        serde_json::from_str(&body).map_err(|err| AuditLogError::InvalidResponse(err.to_string()))
    }
}

/// Which entries to request.
#[derive(Debug, Clone)]
pub struct AuditLogQuery {
    /// Project key, or `*` for every project.
    pub project: String,
    pub environment: String,
    /// Only entries strictly after this epoch-millisecond timestamp are kept.
    pub after_ms: i64,
    pub limit: u32,
    pub actions: Vec<AuditAction>,
}

impl AuditLogQuery {
    pub fn new(project: impl Into<String>, environment: impl Into<String>, after_ms: i64) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
            after_ms,
            limit: DEFAULT_PAGE_LIMIT,
            actions: AuditAction::ALL.to_vec(),
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Resource filter body sent with every page request.
    fn policy(&self) -> Vec<PolicyStatement> {
        vec![PolicyStatement {
            resources: vec![format!(
                "proj/{}:env/{}:flag/*",
                self.project, self.environment
            )],
            effect: "allow",
            actions: self.actions.iter().map(AuditAction::as_str).collect(),
        }]
    }
}

#[derive(Debug, Serialize)]
struct PolicyStatement {
    resources: Vec<String>,
    effect: &'static str,
    actions: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct AuditLogPage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(rename = "_links")]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    next: Option<PageLink>,
}

#[derive(Debug, Deserialize)]
struct PageLink {
    #[serde(default)]
    href: String,
}

/// Lazily pages through the audit log, newest entries first.
#[derive(Debug)]
pub struct AuditLogPager<'a> {
    client: &'a Client,
    query: AuditLogQuery,
    next_href: Option<String>,
    started: bool,
    done: bool,
}

impl AuditLogPager<'_> {
    /// Fetches the next page.
    ///
    /// Returns `Ok(None)` once the log is exhausted or the cutoff was
    /// reached. Entries at or before the cutoff, and entries that cannot be
    /// normalized, are left out of the returned page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawAuditEvent>>, AuditLogError> {
        if self.done {
            return Ok(None);
        }

        let (url, params) = match self.next_href.take() {
            Some(href) => (self.resolve(&href), Vec::new()),
            None if !self.started => (
                format!("{}{AUDIT_LOG_PATH}", self.client.base_url),
                vec![
                    ("limit", self.query.limit.to_string()),
                    ("after", self.query.after_ms.to_string()),
                ],
            ),
            None => return Ok(None),
        };
        self.started = true;

        let page = self
            .client
            .fetch_page(&url, &params, &self.query.policy())
            .await?;
        let item_count = page.items.len();
        tracing::info!(items = item_count, "received audit log page");

        if item_count == 0 {
            self.done = true;
            return Ok(None);
        }

        let mut oldest = i64::MAX;
        let mut events = Vec::with_capacity(item_count);
        for item in page.items {
            let entry: AuditLogEntry = match serde_json::from_value(item) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping malformed audit entry");
                    continue;
                }
            };
            if let Some(date) = entry.date {
                oldest = oldest.min(date);
            }
            match RawAuditEvent::from_entry(entry, &self.client.base_url) {
                Ok(event) if event.timestamp_ms > self.query.after_ms => events.push(event),
                Ok(_) => {}
                Err(err) => tracing::debug!(error = %err, "skipping audit entry"),
            }
        }

        let next = page
            .links
            .and_then(|links| links.next)
            .map(|link| link.href)
            .filter(|href| !href.is_empty());
        let short_page = item_count < self.query.limit as usize;
        let past_cutoff = oldest <= self.query.after_ms;
        if short_page || past_cutoff || next.is_none() {
            tracing::debug!(short_page, past_cutoff, "reached end of audit log");
            self.done = true;
        } else {
            self.next_href = next;
        }

        Ok(Some(events))
    }

    /// Drains every page and returns the events oldest first.
    pub async fn collect_all(mut self) -> Result<Vec<RawAuditEvent>, AuditLogError> {
        let mut events = Vec::new();
        let mut pages = 0usize;
        while let Some(page) = self.next_page().await? {
            pages += 1;
            events.extend(page);
        }
        // Pages are newest first; ties keep API order after the stable sort.
        events.reverse();
        events.sort_by_key(|event| event.timestamp_ms);
        tracing::info!(pages, events = events.len(), "fetched audit log");
        Ok(events)
    }

    fn resolve(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{href}", self.client.base_url)
        }
    }
}

fn status_error(status: StatusCode, body: &str, retry_after: Option<u64>) -> AuditLogError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AuditLogError::RateLimited { retry_after };
    }
    let message = parse_api_message(body).unwrap_or_else(|| body.trim().to_string());
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AuditLogError::Unauthorized {
            status: status.as_u16(),
            message,
        };
    }
    AuditLogError::Api {
        status: status.as_u16(),
        message,
    }
}

fn parse_api_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.message)
}
