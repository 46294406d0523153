use super::ui;
use crate::catalog::CatalogCache;
use crate::core::FundRecord;
use crate::core::query::sanitize_fund_code;
use anyhow::{Context, Result, anyhow, bail};

pub async fn run(catalog: &CatalogCache, code: &str, json: bool) -> Result<()> {
    let code = sanitize_fund_code(code).ok_or_else(|| anyhow!("Invalid fund code: {code}"))?;

    let spinner = ui::new_spinner("Loading fund catalog...");
    let fund = catalog.lookup(&code).await;
    spinner.finish_and_clear();
    let Some(fund) = fund.context("Fund lookup is temporarily unavailable")? else {
        bail!("Fund {code} not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&fund)?);
    } else {
        println!("{}", display_fund(&fund));
    }
    Ok(())
}

pub fn display_fund(fund: &FundRecord) -> String {
    let mut table = ui::new_styled_table();
    for (label, value) in [
        ("Code", fund.code.as_str()),
        ("Name", fund.name.as_str()),
        ("Pinyin", fund.phonetic_abbreviation.as_str()),
        ("Type", fund.fund_type.as_str()),
    ] {
        table.add_row(vec![ui::header_cell(label), ui::text_cell(value)]);
    }

    format!(
        "Fund: {}\n\n{}",
        ui::style_text(&fund.to_string(), ui::StyleType::Title),
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_fund() {
        let fund = FundRecord {
            code: "110011".to_string(),
            name: "易方达蓝筹混合".to_string(),
            phonetic_abbreviation: String::new(),
            fund_type: "混合型-偏股".to_string(),
        };
        let output = display_fund(&fund);
        assert!(output.contains("110011"));
        assert!(output.contains("易方达蓝筹混合"));
        assert!(output.contains("混合型-偏股"));
        assert!(output.contains("Pinyin"));
    }
}
