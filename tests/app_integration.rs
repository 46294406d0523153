use fundex::catalog::CatalogCache;
use fundex::core::CatalogSource;
use fundex::providers::EastmoneyProvider;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const CATALOG_JS: &str = r#"var r = [["110011","YFDLCHH","易方达蓝筹混合","混合型-偏股","YIFANGDALANCHOUHUNHE"],["110022","YFDXFHY","易方达消费行业","股票型","YIFANGDAXIAOFEIHANGYE"],["000001","HXCZHH","华夏成长混合","混合型-灵活","HUAXIACHENGZHANGHUNHE"],["","BAD","缺少代码",""],["161725","ZSZZBJZSLOFA","招商中证白酒指数(LOF)A","指数型-股票","ZHAOSHANGZHONGZHENGBAIJIUZHISHU"]];"#;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const CATALOG_PATH: &str = "/js/fundcode_search.js";

    pub async fn create_catalog_mock_server(body: &str, expected_calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(CATALOG_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_calls)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(base_url: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
providers:
  eastmoney:
    base_url: {base_url}
catalog:
  ttl_secs: 3600
  fetch_timeout_secs: 5
"#
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
        config_file
    }
}

fn catalog_for(base_url: &str, ttl: Duration) -> CatalogCache {
    let provider = EastmoneyProvider::new(base_url, Duration::from_secs(5)).unwrap();
    CatalogCache::new(
        Arc::new(provider) as Arc<dyn CatalogSource>,
        ttl,
        Duration::from_secs(10),
    )
}

#[test_log::test(tokio::test)]
async fn test_search_and_lookup_against_mock_provider() {
    let mock_server = test_utils::create_catalog_mock_server(CATALOG_JS, 1).await;
    let catalog = catalog_for(&mock_server.uri(), Duration::from_secs(3600));

    let mut codes: Vec<String> = catalog
        .search("易方达", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.code)
        .collect();
    codes.sort();
    assert_eq!(codes, vec!["110011", "110022"]);

    let exact = catalog.search("110011", 5).await.unwrap();
    assert_eq!(exact[0].code, "110011");

    let by_pinyin = catalog.search("zszz", 5).await.unwrap();
    assert_eq!(by_pinyin.len(), 1);
    assert_eq!(by_pinyin[0].name, "招商中证白酒指数(LOF)A");

    assert!(catalog.lookup("999999").await.unwrap().is_none());
    assert!(catalog.search("x", 5).await.unwrap().is_empty());

    let fund = catalog.lookup("000001").await.unwrap().unwrap();
    assert_eq!(fund.fund_type, "混合型-灵活");

    let status = catalog.status().unwrap();
    info!(?status, "Catalog status");
    assert_eq!(status.records, 4);
    assert_eq!(status.skipped, 1);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_concurrent_first_access_fetches_once() {
    let mock_server = test_utils::create_catalog_mock_server(CATALOG_JS, 1).await;
    let catalog = catalog_for(&mock_server.uri(), Duration::from_secs(3600));

    let searches = (0..8).map(|_| catalog.search("混合", 10));
    for result in join_all(searches).await {
        assert_eq!(result.unwrap().len(), 2);
    }
    let lookups = ["110011", "110022", "000001", "161725"].map(|code| catalog.lookup(code));
    for result in join_all(lookups).await {
        assert!(result.unwrap().is_some());
    }
}

#[test_log::test(tokio::test)]
async fn test_unreachable_provider_reports_unavailable() {
    // Nothing mounted: every request gets a 404.
    let mock_server = wiremock::MockServer::start().await;
    let catalog = catalog_for(&mock_server.uri(), Duration::from_secs(3600));

    let err = catalog.search("易方达", 10).await.unwrap_err();
    assert!(err.to_string().starts_with("fund catalog unavailable"), "{err}");
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_catalog_mock_server(CATALOG_JS, 1).await;
    let config_file = test_utils::write_config(&mock_server.uri());

    let result = fundex::run_command(
        fundex::AppCommand::Search {
            keyword: "易方达".to_string(),
            limit: Some(5),
            json: true,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Search command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_info_command_flow() {
    let mock_server = test_utils::create_catalog_mock_server(CATALOG_JS, 2).await;
    let config_file = test_utils::write_config(&mock_server.uri());
    let config_path = config_file.path().to_str().unwrap();

    let found = fundex::run_command(
        fundex::AppCommand::Info {
            code: "110-011".to_string(),
            json: false,
        },
        Some(config_path),
    )
    .await;
    assert!(found.is_ok(), "Info command failed with: {:?}", found.err());

    let missing = fundex::run_command(
        fundex::AppCommand::Info {
            code: "999999".to_string(),
            json: true,
        },
        Some(config_path),
    )
    .await;
    assert!(missing.unwrap_err().to_string().contains("not found"));
}

#[test_log::test(tokio::test)]
async fn test_invalid_input_is_rejected_before_fetching() {
    let mock_server = test_utils::create_catalog_mock_server(CATALOG_JS, 0).await;
    let config_file = test_utils::write_config(&mock_server.uri());
    let config_path = config_file.path().to_str().unwrap();

    let short = fundex::run_command(
        fundex::AppCommand::Search {
            keyword: "易".to_string(),
            limit: None,
            json: false,
        },
        Some(config_path),
    )
    .await;
    assert!(short.unwrap_err().to_string().contains("at least 2 characters"));

    let bad_code = fundex::run_command(
        fundex::AppCommand::Info {
            code: "12345".to_string(),
            json: false,
        },
        Some(config_path),
    )
    .await;
    assert!(bad_code.unwrap_err().to_string().contains("Invalid fund code"));
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("absent.yaml");
    assert!(!config_path.exists());

    let result = fundex::run_command(
        fundex::AppCommand::Info {
            code: "110011".to_string(),
            json: false,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}
