//! Fund catalog records and the data source abstraction

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Length of a fund code; codes are all ASCII digits.
pub const FUND_CODE_LEN: usize = 6;

/// One row as delivered by a catalog source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFundRow {
    pub code: Option<String>,
    pub name: Option<String>,
    pub phonetic_abbreviation: Option<String>,
    pub fund_type: Option<String>,
}

/// A validated catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRecord {
    pub code: String,
    pub name: String,
    /// Upper-cased latin initials of `name`, possibly empty.
    #[serde(rename = "pinyin")]
    pub phonetic_abbreviation: String,
    #[serde(rename = "type")]
    pub fund_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("row has no fund code")]
    MissingCode,
    #[error("invalid fund code {0:?}")]
    InvalidCode(String),
}

pub fn is_fund_code(code: &str) -> bool {
    code.len() == FUND_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

impl TryFrom<RawFundRow> for FundRecord {
    type Error = MalformedRecord;

    fn try_from(row: RawFundRow) -> Result<Self, Self::Error> {
        let code = row
            .code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(MalformedRecord::MissingCode)?;
        if !is_fund_code(&code) {
            return Err(MalformedRecord::InvalidCode(code));
        }

        let clean = |field: Option<String>| field.map(|v| v.trim().to_string()).unwrap_or_default();

        Ok(FundRecord {
            code,
            name: clean(row.name),
            phonetic_abbreviation: clean(row.phonetic_abbreviation).to_uppercase(),
            fund_type: clean(row.fund_type),
        })
    }
}

impl Display for FundRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.name)
    }
}

/// The one I/O dependency of the catalog: a full listing of known funds.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<RawFundRow>>;
}
