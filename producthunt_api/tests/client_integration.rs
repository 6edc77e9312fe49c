use producthunt_api::{Client, Credentials, Error, PostsQuery, Query};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn credentials() -> Credentials {
    Credentials {
        client_id: "test-id".to_string(),
        client_secret: "test-secret".to_string(),
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/oauth/token"))
        .and(body_partial_json(serde_json::json!({
            "client_id": "test-id",
            "grant_type": "client_credentials"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("token.json")))
        .mount(server)
        .await;
}

#[tokio::test]
async fn get_posts_success() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("posts.json")))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials()).unwrap();
    let result = client.get_posts(&PostsQuery::default().with_first(20)).await;
    assert!(result.is_ok());

    let posts = result.unwrap();
    assert_eq!(posts.edges.len(), 2);
    assert_eq!(posts.next_cursor(), Some("MjA"));
    assert!(client.has_valid_token());
}

#[tokio::test]
async fn token_is_reused_across_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("token.json")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("posts_empty.json")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials())
        .unwrap()
        .with_stealth(false);
    client.get_posts(&PostsQuery::default()).await.unwrap();
    client.get_posts(&PostsQuery::default()).await.unwrap();
}

#[tokio::test]
async fn invalidate_token_forces_reauthentication() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("token.json")))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("posts_empty.json")))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials()).unwrap();
    client.get_posts(&PostsQuery::default()).await.unwrap();
    client.invalidate_token();
    assert!(!client.has_valid_token());
    client.get_posts(&PostsQuery::default()).await.unwrap();
}

#[tokio::test]
async fn get_posts_unauthorized() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"invalid_token\"}"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials()).unwrap();
    let err = client.get_posts(&PostsQuery::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn get_posts_rate_limited() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials()).unwrap();
    let err = client.get_posts(&PostsQuery::default()).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 429, .. }));
}

#[tokio::test]
async fn get_posts_malformed_json() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not valid json}"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials()).unwrap();
    let err = client.get_posts(&PostsQuery::default()).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn get_posts_graphql_errors() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v2/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("graphql_errors.json")))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials()).unwrap();
    let err = client.get_posts(&PostsQuery::default()).await.unwrap_err();
    assert!(matches!(err, Error::GraphQl { .. }));
    assert!(err.graphql_mentions(&["invalid value"]));
}

#[tokio::test]
async fn token_endpoint_rejection_surfaces_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"invalid_client\"}"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri(), credentials()).unwrap();
    let err = client.authenticate().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!client.has_valid_token());
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let client = Client::with_base_url("http://127.0.0.1:1", credentials()).unwrap();
    let err = client.get_posts(&PostsQuery::default()).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}
