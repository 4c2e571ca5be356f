use chrono::TimeDelta;
use config::JwtAlgorithm;
use indoc::{formatdoc, indoc};
use integration_tests::{TEST_SECRET, TestServer, TokenBuilder, token};
use serde_json::json;

const NO_RATE_LIMITS: &str = indoc! {r#"
    [server.rate_limits]
    enabled = false
"#};

#[tokio::test]
async fn valid_token_reaches_the_handler() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;

    let response = server.client.get_with_token("/api/me", &token("emp-42", "employee")).await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "role": "employee",
      "subject": "emp-42"
    }
    "#);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;

    let response = server.client.get("/api/me").await;

    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
    assert_eq!(response.headers()["content-type"], "application/json");

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"error":"unauthorized"}"#);
}

#[tokio::test]
async fn scheme_is_case_sensitive() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;
    let token = token("emp-42", "employee");

    let mut statuses = Vec::new();

    for header in [format!("Bearer {token}"), format!("bearer {token}"), format!("Token {token}"), token.clone()] {
        let response = server
            .client
            .request(reqwest::Method::GET, "/api/me")
            .header("Authorization", header)
            .send()
            .await
            .unwrap();

        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, [200, 401, 401, 401]);
}

#[tokio::test]
async fn rejected_tokens() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;

    let cases = [
        (
            "other key",
            TokenBuilder::new(json!({ "sub": "emp-1", "role": "admin" }))
                .secret("some-other-secret-that-is-also-long-enough")
                .build(),
        ),
        (
            "other algorithm",
            TokenBuilder::new(json!({ "sub": "emp-1", "role": "admin" }))
                .algorithm(JwtAlgorithm::Hs512)
                .build(),
        ),
        (
            "expired",
            TokenBuilder::new(json!({ "sub": "emp-1", "role": "admin" }))
                .expires_in(TimeDelta::minutes(-5))
                .build(),
        ),
        (
            "no expiry",
            TokenBuilder::new(json!({ "sub": "emp-1", "role": "admin" }))
                .without_expiry()
                .build(),
        ),
        (
            "role of wrong type",
            TokenBuilder::new(json!({ "sub": "emp-1", "role": 1 })).build(),
        ),
        (
            "unknown role",
            TokenBuilder::new(json!({ "sub": "emp-1", "role": "superuser" })).build(),
        ),
        ("missing subject", TokenBuilder::new(json!({ "role": "admin" })).build()),
        ("garbage", "not.a.jwt".to_string()),
    ];

    for (case, token) in cases {
        let response = server.client.get_with_token("/api/me", &token).await;
        assert_eq!(response.status(), 401, "{case} should be rejected");

        let body = response.text().await.unwrap();
        assert_eq!(body, r#"{"error":"unauthorized"}"#, "{case} leaked details");
    }
}

#[tokio::test]
async fn configured_algorithm_is_used() {
    let config = formatdoc! {r#"
        [server.auth]
        secret = "{TEST_SECRET}{TEST_SECRET}"
        algorithm = "HS512"

        [server.rate_limits]
        enabled = false
    "#};

    let server = TestServer::builder().build(&config).await;
    let secret = format!("{TEST_SECRET}{TEST_SECRET}");

    let hs512 = TokenBuilder::new(json!({ "sub": "mgr-7", "role": "manager" }))
        .algorithm(JwtAlgorithm::Hs512)
        .secret(&secret)
        .build();

    let hs256 = TokenBuilder::new(json!({ "sub": "mgr-7", "role": "manager" }))
        .secret(&secret)
        .build();

    assert_eq!(server.client.get_with_token("/api/me", &hs512).await.status(), 200);
    assert_eq!(server.client.get_with_token("/api/me", &hs256).await.status(), 401);
}

#[tokio::test]
async fn public_routes_need_no_token() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;

    let response = server.client.get("/public/holidays").await;
    assert_eq!(response.status(), 200);

    // A broken token on a public route is ignored.
    let response = server.client.get_with_token("/public/holidays", "not.a.jwt").await;
    assert_eq!(response.status(), 200);
}
