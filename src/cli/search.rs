use super::ui;
use crate::catalog::{CatalogCache, CatalogStatus};
use crate::core::FundRecord;
use crate::core::config::SearchConfig;
use crate::core::query::{MIN_KEYWORD_CHARS, is_searchable_keyword, normalize_limit};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use serde::Serialize;

#[derive(Serialize)]
struct SearchOutput<'a> {
    keyword: &'a str,
    count: usize,
    results: &'a [FundRecord],
}

pub async fn run(
    catalog: &CatalogCache,
    config: &SearchConfig,
    keyword: &str,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let keyword = keyword.trim();
    if !is_searchable_keyword(keyword) {
        bail!("Keyword must be at least {MIN_KEYWORD_CHARS} characters");
    }
    let limit = normalize_limit(limit, config.default_limit, config.max_limit);

    let spinner = ui::new_spinner("Loading fund catalog...");
    let results = catalog.search(keyword, limit).await;
    spinner.finish_and_clear();
    let results = results.context("Fund search is temporarily unavailable")?;

    if json {
        let output = SearchOutput {
            keyword,
            count: results.len(),
            results: &results,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", display_results(keyword, &results, catalog.status()));
    }
    Ok(())
}

pub fn display_results(keyword: &str, results: &[FundRecord], status: Option<CatalogStatus>) -> String {
    let mut output = format!(
        "Search: {}\n\n",
        ui::style_text(keyword, ui::StyleType::Title)
    );

    if results.is_empty() {
        output.push_str("No matching funds found.");
    } else {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Code"),
            ui::header_cell("Name"),
            ui::header_cell("Pinyin"),
            ui::header_cell("Type"),
        ]);
        for fund in results {
            table.add_row(vec![
                Cell::new(&fund.code),
                ui::text_cell(&fund.name),
                ui::text_cell(&fund.phonetic_abbreviation),
                ui::text_cell(&fund.fund_type),
            ]);
        }
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{} result(s)",
            ui::style_text(&results.len().to_string(), ui::StyleType::Highlight)
        ));
    }

    if let Some(status) = status {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Catalog of {} funds fetched {}",
                    status.records,
                    status.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}
