//! Integration tests for catalog synchronization
//!
//! These tests use wiremock to serve a fake catalog and run the full
//! crawl, extract and reconcile cycle against real HTTP and SQLite.

use chrono::Duration;
use tour_sync::config::{CatalogConfig, Config, OutputConfig, UserAgentConfig};
use tour_sync::crawler::{HttpFetcher, PageFetcher};
use tour_sync::extract::{DateRangeParser, ItemExtractor};
use tour_sync::storage::{EventStore, RunStatus, SqliteStorage};
use tour_sync::{SyncEngine, SyncReport};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &str, max_pages: u32) -> Config {
    Config {
        catalog: CatalogConfig {
            base_url: format!("{}/catalog/", base_url),
            item_path_prefix: "/tours/".to_string(),
            page_param: "page".to_string(),
            max_pages,
            item_delay_ms: 10, // Very short for testing
            key_prefix: "tour".to_string(),
            default_currency: "RUB".to_string(),
            respect_robots: true,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            summary_path: "./test_summary.md".to_string(),
            run_lease_secs: 3600,
        },
    }
}

fn create_engine(config: &Config) -> SyncEngine<HttpFetcher> {
    let fetcher = HttpFetcher::from_config(&config.user_agent, &config.catalog)
        .expect("Failed to build fetcher");
    let extractor = ItemExtractor::new(
        DateRangeParser::with_reference_year(2026).expect("Failed to build date parser"),
        &config.catalog.default_currency,
    )
    .expect("Failed to build extractor");
    SyncEngine::with_extractor(fetcher, config, extractor)
}

fn item_html(title: &str, price: &str, dates: &[&str]) -> String {
    let entries: String = dates.iter().map(|d| format!("<li>{}</li>", d)).collect();
    format!(
        r#"<html><head>
             <meta name="description" content="Отдых в Кисловодске">
             <meta itemprop="priceCurrency" content="RUB">
           </head><body>
             <h1>{}</h1>
             <div class="tour-tags"><a href="/tags/group">Групповые туры</a></div>
             <span data-price="{}"></span>
             <h3>Ближайшие даты</h3>
             <ul>{}</ul>
           </body></html>"#,
        title, price, entries
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Two listing pages, three tours, five departures
async fn mount_catalog(server: &MockServer) {
    // Page 2 is mounted first so it wins over the generic listing mock
    Mock::given(method("GET"))
        .and(path("/catalog/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/tours/dombai/">Домбай</a> <a href="/tours/elbrus/">Эльбрус</a>"#,
        ))
        .mount(server)
        .await;

    mount_page(
        server,
        "/catalog/",
        r#"<a href="/tours/kislovodsk/">Кисловодск</a>
           <a href="/tours/dombai/">Домбай</a>
           <a href="/catalog/?page=2">2</a>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/tours/kislovodsk/",
        item_html(
            "Кисловодск 7 дней",
            "45 000",
            &["16-22 марта 2026", "26 мая-1 июня 2026"],
        ),
    )
    .await;
    mount_page(
        server,
        "/tours/dombai/",
        item_html("Домбай 3 дня", "28 500", &["с 5 по 7 мая 2026", "скоро"]),
    )
    .await;
    mount_page(
        server,
        "/tours/elbrus/",
        item_html("Эльбрус", "60 000", &["5 апреля 2026", "10 июля – 17 июля 2026"]),
    )
    .await;
}

/// Runs one recorded sync, the way the CLI does
async fn recorded_run(config: &Config, storage: &mut SqliteStorage) -> SyncReport {
    let run_id = storage
        .begin_run("test-hash", Duration::hours(1))
        .expect("Failed to begin run");
    let report = create_engine(config)
        .synchronize(storage)
        .await
        .expect("Sync failed");
    storage
        .finish_run(run_id, RunStatus::Completed, &report.totals())
        .expect("Failed to finish run");
    report
}

#[tokio::test]
async fn test_full_sync_then_idempotent_rerun() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("events.db");
    let config = create_test_config(&mock_server.uri(), db_path.to_str().unwrap(), 10);
    let mut storage = SqliteStorage::new(&db_path).expect("Failed to open storage");

    let first = recorded_run(&config, &mut storage).await;
    assert!(first.errors.is_empty(), "Unexpected errors: {:?}", first.errors);
    assert_eq!(first.created, 5);
    assert_eq!(first.updated, 0);
    assert_eq!(first.archived, 0);
    assert_eq!(first.items.len(), 3);

    let second = recorded_run(&config, &mut storage).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.archived, 0);
    assert_eq!(second.updated, 5);

    let events = storage.get_all_events().unwrap();
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| !e.archived));

    let kislovodsk = events
        .iter()
        .find(|e| e.external_id() == Some("tour_kislovodsk_2026-05-26"))
        .expect("Missing cross-month departure");
    assert_eq!(kislovodsk.fields.end_date.to_string(), "2026-06-01");
    assert_eq!(kislovodsk.fields.price, 45000);
    assert_eq!(kislovodsk.fields.locations, vec!["Кисловодск"]);

    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.status, RunStatus::Completed);
    assert_eq!(latest.totals.updated, 5);
}

#[tokio::test]
async fn test_vanished_tour_is_archived() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("events.db");
    let mut storage = SqliteStorage::new(&db_path).expect("Failed to open storage");

    let before = MockServer::start().await;
    mount_catalog(&before).await;
    let config = create_test_config(&before.uri(), db_path.to_str().unwrap(), 10);
    recorded_run(&config, &mut storage).await;

    // Elbrus is gone and Kislovodsk dropped its May departure
    let after = MockServer::start().await;
    mount_page(
        &after,
        "/catalog/",
        r#"<a href="/tours/kislovodsk/">К</a> <a href="/tours/dombai/">Д</a>"#.to_string(),
    )
    .await;
    mount_page(
        &after,
        "/tours/kislovodsk/",
        item_html("Кисловодск 7 дней", "47 000", &["16-22 марта 2026"]),
    )
    .await;
    mount_page(
        &after,
        "/tours/dombai/",
        item_html("Домбай 3 дня", "28 500", &["с 5 по 7 мая 2026"]),
    )
    .await;

    let config = create_test_config(&after.uri(), db_path.to_str().unwrap(), 10);
    let report = recorded_run(&config, &mut storage).await;

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 2);
    assert_eq!(report.archived, 3);

    let mut archived: Vec<String> = storage
        .get_all_events()
        .unwrap()
        .into_iter()
        .filter(|e| e.archived)
        .filter_map(|e| e.fields.external_id)
        .collect();
    archived.sort();
    assert_eq!(
        archived,
        vec![
            "tour_elbrus_2026-04-05",
            "tour_elbrus_2026-07-10",
            "tour_kislovodsk_2026-05-26",
        ]
    );
    assert_eq!(storage.count_events(false).unwrap(), 2);
}

#[tokio::test]
async fn test_titleless_page_is_dropped() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/catalog/",
        r#"<a href="/tours/broken/">?</a> <a href="/tours/arkhyz/">Архыз</a>"#.to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/tours/broken/",
        "<html><body><p>Страница на реконструкции</p></body></html>".to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/tours/arkhyz/",
        item_html("Архыз 5 дней", "31 000", &["1-5 августа 2026"]),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), ":memory:", 10);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let report = create_engine(&config)
        .synchronize(&mut storage)
        .await
        .expect("Sync failed");

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("/tours/broken/"));
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].name, "Архыз 5 дней");
    assert_eq!(report.created, 1);
    assert_eq!(storage.get_all_events().unwrap().len(), 1);
}

#[tokio::test]
async fn test_listing_stops_at_page_ceiling() {
    let mock_server = MockServer::start().await;

    // Every listing page claims there is another one
    Mock::given(method("GET"))
        .and(path("/catalog/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/tours/endless/">∞</a> <link rel="next" href="?page=999">"#,
        ))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/tours/endless/",
        item_html("Бесконечный тур", "1 000", &["5 апреля 2026"]),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), ":memory:", 3);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let report = create_engine(&config)
        .synchronize(&mut storage)
        .await
        .expect("Sync failed");

    assert!(report.errors.is_empty());
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.created, 1);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    mount_page(
        &mock_server,
        "/robots.txt",
        "User-agent: TestBot\nDisallow: /tours/elbrus/".to_string(),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), ":memory:", 10);
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let report = create_engine(&config)
        .synchronize(&mut storage)
        .await
        .expect("Sync failed");

    assert!(report.errors.is_empty());
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.created, 3);

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/tours/elbrus/"));
}

#[tokio::test]
async fn test_fetcher_identifies_itself_and_maps_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hello"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("привет"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ":memory:", 1);
    let fetcher = HttpFetcher::from_config(&config.user_agent, &config.catalog).unwrap();

    let body = fetcher
        .fetch_text(&format!("{}/hello", mock_server.uri()))
        .await
        .expect("Fetch failed");
    assert_eq!(body, "привет");

    let err = fetcher
        .fetch_text(&format!("{}/gone", mock_server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(410));
}
