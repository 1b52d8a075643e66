//! Audit-log fetching shared by every command.

use anyhow::{Context, Result};
use ff_client::{AuditLogQuery, Client};
use ff_core::{RawAuditEvent, format_timestamp};

use crate::Config;
use crate::config::API_KEY_ENV;

/// Fetches every audit entry after the configured cutoff, oldest first.
pub fn fetch_events(config: &Config) -> Result<Vec<RawAuditEvent>> {
    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("missing API key (set {API_KEY_ENV}, FFAUDIT_API_KEY or config.toml)")
        })?;

    let client = Client::new(api_key, &config.base_url)
        .context("failed to create audit log client")?;
    let query = AuditLogQuery::new(&config.project, &config.environment, config.search_date)
        .with_limit(config.page_limit);

    tracing::info!(
        project = %config.project,
        environment = %config.environment,
        after = %format_timestamp(config.search_date),
        "fetching audit log"
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime
        .block_on(client.pager(query).collect_all())
        .context("failed to fetch audit log")
}
