/// Failures that escape the catalog. Everything else (stale data, malformed
/// rows, short keywords) is absorbed and shows up only in result contents.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("fund catalog unavailable: {0:#}")]
    SourceUnavailable(anyhow::Error),
}
