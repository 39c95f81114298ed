//! Load runner tests: several virtual users against a mock site.

use search_load_test::config::TargetOverride;
use search_load_test::{BehaviorConfig, ExecutorConfig, LoadRunner, Scenario, TestConfig};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, scenario: Scenario, executor: ExecutorConfig, behavior: BehaviorConfig) -> TestConfig {
    TestConfig {
        name: "mock".to_string(),
        description: "Runner test against a mock server".to_string(),
        scenario,
        environment: Default::default(),
        target: Some(TargetOverride {
            base_url: server.uri(),
            api_url: server.uri(),
        }),
        queries: vec!["flood".to_string(), "climate law".to_string()],
        queries_file: None,
        executor,
        behavior,
        seed: Some(11),
    }
}

async fn mount_pages(server: &MockServer, search_status: u16) {
    for route in ["/", "/api/v1/config", "/search"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/api/v1/searches"))
        .respond_with(ResponseTemplate::new(search_status).set_body_json(json!({"families": []})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_shared_iterations_landing_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("App-Token", "runner-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(10)
        .mount(&server)
        .await;

    let behavior = BehaviorConfig {
        p_search: 0.0,
        think_time_scale: 0.0,
        ..Default::default()
    };
    let config = config_for(
        &server,
        Scenario::BasicSearchBrowse,
        ExecutorConfig::SharedIterations { vus: 2, iterations: 5 },
        behavior,
    );

    let results = LoadRunner::new(config, "runner-token")
        .without_progress()
        .run()
        .await
        .unwrap();

    assert_eq!(results.walks_completed, 5);
    assert_eq!(results.total_requests, 10);
    assert_eq!(results.ok_requests, 10);
    assert_eq!(results.page_visits.get("landing_page"), Some(&5));
    assert_eq!(results.vus, 2);
}

#[tokio::test]
async fn test_rate_limited_searches_are_not_failures() {
    let server = MockServer::start().await;
    mount_pages(&server, 429).await;

    let behavior = BehaviorConfig {
        p_search: 1.0,
        p_choose: 1.0,
        think_time_scale: 0.0,
        ..Default::default()
    };
    let config = config_for(
        &server,
        Scenario::BasicSearchBrowse,
        ExecutorConfig::SharedIterations { vus: 3, iterations: 6 },
        behavior,
    );

    let results = LoadRunner::new(config, "token").without_progress().run().await.unwrap();

    // landing + config + search page + search API, per walk
    assert_eq!(results.total_requests, 24);
    assert_eq!(results.rate_limited_requests, 6);
    assert_eq!(results.failed_requests, 0);
    assert_eq!(results.check_pass_rate(), 100.0);
    assert_eq!(results.page_visits.get("search_page"), Some(&6));
    assert_eq!(results.page_visits.get("document_page"), None);
}

#[tokio::test]
async fn test_single_search_scenario_counts_failures() {
    let server = MockServer::start().await;
    mount_pages(&server, 500).await;

    let behavior = BehaviorConfig {
        think_time_scale: 0.0,
        ..Default::default()
    };
    let config = config_for(
        &server,
        Scenario::SingleSearch,
        ExecutorConfig::SharedIterations { vus: 1, iterations: 3 },
        behavior,
    );

    let results = LoadRunner::new(config, "token").without_progress().run().await.unwrap();

    assert_eq!(results.total_requests, 6);
    assert_eq!(results.failed_requests, 3);
    assert_eq!(results.rate_limited_requests, 0);
    assert_eq!(results.scenario_name, "single-search");
}

#[tokio::test]
async fn test_constant_vus_stops_after_duration() {
    let server = MockServer::start().await;
    mount_pages(&server, 200).await;

    let behavior = BehaviorConfig {
        p_search: 0.0,
        think_time_scale: 0.0,
        ..Default::default()
    };
    let config = config_for(
        &server,
        Scenario::BasicSearchBrowse,
        ExecutorConfig::ConstantVus { vus: 2, duration_secs: 1 },
        behavior,
    );

    let results = LoadRunner::new(config, "token").without_progress().run().await.unwrap();

    assert!(results.walks_completed > 0);
    assert_eq!(results.total_requests, results.walks_completed * 2);
    assert_eq!(results.failed_requests, 0);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let server = MockServer::start().await;
    let mut config = config_for(
        &server,
        Scenario::BasicSearchBrowse,
        ExecutorConfig::SharedIterations { vus: 1, iterations: 1 },
        BehaviorConfig::default(),
    );
    config.queries.clear();

    assert!(LoadRunner::new(config, "token").without_progress().run().await.is_err());
}
