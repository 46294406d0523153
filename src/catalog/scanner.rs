use crate::core::FundRecord;

/// Case-folded forms of a search keyword, computed once per query.
#[derive(Debug, Clone)]
pub struct Keyword {
    pub raw: String,
    pub lower: String,
    pub upper: String,
}

impl Keyword {
    pub fn new(keyword: &str) -> Self {
        let raw = keyword.trim().to_string();
        Keyword {
            lower: raw.to_lowercase(),
            upper: raw.to_uppercase(),
            raw,
        }
    }

    pub fn char_count(&self) -> usize {
        self.raw.chars().count()
    }

    pub fn is_numeric(&self) -> bool {
        !self.raw.is_empty() && self.raw.bytes().all(|b| b.is_ascii_digit())
    }

    /// The baseline match rule every search path must agree with.
    pub fn matches(&self, record: &FundRecord) -> bool {
        record.code.contains(&self.raw)
            || record.name.to_lowercase().contains(&self.lower)
            || record.phonetic_abbreviation.contains(&self.upper)
    }
}

/// Linear scan over `records` in catalog order, independent of any index.
/// Records for which `skip` returns true are passed over without counting
/// toward `limit`.
pub fn scan<'a>(
    records: &'a [FundRecord],
    keyword: &Keyword,
    limit: usize,
    mut skip: impl FnMut(&FundRecord) -> bool,
) -> Vec<&'a FundRecord> {
    records
        .iter()
        .filter(|record| !skip(record) && keyword.matches(record))
        .take(limit)
        .collect()
}

/// Linear lookup by exact code.
pub fn find_code<'a>(records: &'a [FundRecord], code: &str) -> Option<&'a FundRecord> {
    records.iter().find(|record| record.code == code)
}
