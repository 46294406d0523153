use crate::core::{CatalogSource, RawFundRow};
use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const CATALOG_PATH: &str = "/js/fundcode_search.js";

// Column positions in each catalog row.
const COL_CODE: usize = 0;
const COL_PHONETIC: usize = 1;
const COL_NAME: usize = 2;
const COL_TYPE: usize = 3;

const MAX_RETRIES: usize = 2;
const RETRY_DELAY_MS: u64 = 500;
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-request timeout that fits every attempt and its backoff into `budget`.
fn request_timeout(budget: Duration) -> Duration {
    let backoff_ms: u64 = (0..MAX_RETRIES).map(|n| RETRY_DELAY_MS << n).sum();
    let attempts = (MAX_RETRIES + 1) as u32;
    (budget.saturating_sub(Duration::from_millis(backoff_ms)) / attempts).max(MIN_REQUEST_TIMEOUT)
}

/// Fund catalog from Eastmoney's public code list, a JavaScript assignment of
/// the form `var r = [["000001","HXCZHH","华夏成长混合","混合型-灵活","HUAXIA..."], ...];`.
pub struct EastmoneyProvider {
    base_url: String,
    client: reqwest::Client,
}

impl EastmoneyProvider {
    /// `fetch_budget` bounds a whole `fetch_catalog` call, retries included.
    pub fn new(base_url: &str, fetch_budget: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fundex/0.1")
            .timeout(request_timeout(fetch_budget))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(EastmoneyProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl CatalogSource for EastmoneyProvider {
    async fn fetch_catalog(&self) -> Result<Vec<RawFundRow>> {
        let url = format!("{}{}", self.base_url, CATALOG_PATH);
        debug!("Requesting fund catalog from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
            },
            MAX_RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .with_context(|| format!("Failed to fetch fund catalog from {url}"))?;

        let body = response
            .text()
            .await
            .context("Failed to read fund catalog response")?;

        let rows = parse_catalog(&body)?;
        debug!(rows = rows.len(), "Parsed fund catalog");
        Ok(rows)
    }
}

/// Extracts rows from the catalog script. Individual rows that are not arrays
/// or have unexpected cell types are kept with the affected fields missing, so
/// that record validation decides what to drop.
pub fn parse_catalog(body: &str) -> Result<Vec<RawFundRow>> {
    if body.trim().is_empty() {
        return Err(anyhow!("Received empty fund catalog response"));
    }

    let start = body.find('[');
    let end = body.rfind(']');
    let payload = match (start, end) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(anyhow!(
                "Fund catalog response has no row array: '{}'",
                preview(body)
            ));
        }
    };

    let rows: Vec<Value> = serde_json::from_str(payload).with_context(|| {
        format!("Failed to parse fund catalog rows: '{}'", preview(payload))
    })?;

    Ok(rows.iter().map(parse_row).collect())
}

fn parse_row(row: &Value) -> RawFundRow {
    let cells = row.as_array().map(Vec::as_slice).unwrap_or_default();
    let cell = |i: usize| -> Option<String> {
        match cells.get(i)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    RawFundRow {
        code: cell(COL_CODE),
        name: cell(COL_NAME),
        phonetic_abbreviation: cell(COL_PHONETIC),
        fund_type: cell(COL_TYPE),
    }
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 120;
    let mut preview: String = text.chars().take(MAX_CHARS).collect();
    if text.chars().nth(MAX_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}
