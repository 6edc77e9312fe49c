use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use launchtrends_lib::{
    persist, run_collection, ApiPageSource, Client, Collector, CollectionStore, Credentials,
    GovernorConfig, PaginationConfig, PipelineError, RateGovernor, RetryConfig, QueryWindow,
    Timezone, TokioSleeper, WindowOutcome,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn day(d: u32) -> QueryWindow {
    QueryWindow::day(NaiveDate::from_ymd_opt(2024, 1, d).unwrap(), Timezone::Utc)
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        rate_limit_base_delay: Duration::from_millis(2),
        max_delay: Duration::from_millis(5),
        jitter: false,
    }
}

fn collector(server: &MockServer) -> Collector<ApiPageSource, TokioSleeper> {
    let credentials = Credentials {
        client_id: "lib-id".to_string(),
        client_secret: "lib-secret".to_string(),
    };
    let client = Client::with_base_url(&server.uri(), credentials)
        .unwrap()
        .with_stealth(false);
    let reference = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
    Collector::new(
        ApiPageSource::new(client, reference),
        TokioSleeper,
        RateGovernor::with_seed(GovernorConfig::unthrottled(fast_retry()), 5),
        PaginationConfig::default(),
        CancellationToken::new(),
    )
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("token.json")))
        .mount(server)
        .await;
}

async fn mount_day(server: &MockServer, posted_after: &str, fixture: &str) {
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .and(body_partial_json(json!({ "variables": { "postedAfter": posted_after } })))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture(fixture)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn two_days_collected_and_persisted() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .and(body_partial_json(json!({ "variables": { "after": "YzE" } })))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("day1_page2.json")))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_day(&server, "2024-01-01T00:00:00Z", "day1_page1.json").await;
    mount_day(&server, "2024-01-02T00:00:00Z", "day2_empty.json").await;

    let mut collector = collector(&server);
    let collection = run_collection(&mut collector, &[day(1), day(2)], Timezone::Utc, |_| {})
        .await
        .unwrap();

    assert_eq!(collection.records.len(), 5);
    let summary = &collection.summary;
    assert_eq!(summary.windows[0].outcome, WindowOutcome::Ok(5));
    assert_eq!(summary.windows[0].pages, 2);
    assert_eq!(summary.windows[1].outcome, WindowOutcome::Empty);
    assert!(!summary.is_total_failure());

    let first = &collection.records.records()[0];
    assert_eq!(first.name, "Orbit Docs");
    assert_eq!(first.launch_date, "2024-01-01");
    assert_eq!(first.topics, "Developer Tools, Artificial Intelligence");
    assert_eq!(first.makers, "maker101");

    let dir = tempfile::TempDir::new().unwrap();
    let store = CollectionStore::new(dir.path().join("launches.csv"));
    let outcomes = persist(&collection, std::slice::from_ref(&store)).unwrap();
    assert_eq!(outcomes[0].added, 5);
    assert_eq!(store.load_strict().unwrap().len(), 5);

    let again = persist(&collection, std::slice::from_ref(&store)).unwrap();
    assert_eq!(again[0].added, 0);
    assert_eq!(store.load_strict().unwrap().len(), 5);
}

#[tokio::test]
async fn server_errors_fail_only_their_window() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .and(body_partial_json(json!({ "variables": { "postedAfter": "2024-01-01T00:00:00Z" } })))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(3)
        .mount(&server)
        .await;
    mount_day(&server, "2024-01-02T00:00:00Z", "day1_page2.json").await;

    let mut collector = collector(&server);
    let collection = run_collection(&mut collector, &[day(1), day(2)], Timezone::Utc, |_| {})
        .await
        .unwrap();

    let summary = &collection.summary;
    assert!(matches!(summary.windows[0].outcome, WindowOutcome::Failed(_)));
    assert_eq!(summary.windows[1].outcome, WindowOutcome::Ok(2));
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_total_failure());
}

#[tokio::test]
async fn rejected_token_triggers_one_reauthentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("token.json")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"invalid_token\"}"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_day(&server, "2024-01-02T00:00:00Z", "day1_page2.json").await;

    let mut collector = collector(&server);
    let collection = run_collection(&mut collector, &[day(2)], Timezone::Utc, |_| {})
        .await
        .unwrap();
    assert_eq!(collection.summary.windows[0].outcome, WindowOutcome::Ok(2));
}

#[tokio::test]
async fn persistent_auth_failure_aborts_run() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let mut collector = collector(&server);
    let result = run_collection(&mut collector, &[day(1)], Timezone::Utc, |_| {}).await;
    assert!(matches!(result, Err(PipelineError::Auth(_))));
}

#[tokio::test]
async fn leaderboard_window_sends_ranking_order() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .and(body_partial_json(json!({
            "variables": {
                "order": "RANKING",
                "featured": true,
                "postedAfter": "2023-12-27T00:00:00Z"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("day1_page2.json")))
        .expect(1)
        .mount(&server)
        .await;

    let mut collector = collector(&server);
    let window = QueryWindow::Leaderboard(launchtrends_lib::LeaderboardPeriod::Week);
    let collection = run_collection(&mut collector, &[window], Timezone::Pacific, |_| {})
        .await
        .unwrap();
    assert_eq!(collection.summary.windows[0].window, "leaderboard:week");
    assert_eq!(collection.records.len(), 2);
    // Leaderboard records use the run's default timezone: 15:45Z is still Jan 1 in Pacific time.
    assert_eq!(collection.records.records()[0].launch_date, "2024-01-01");
}
