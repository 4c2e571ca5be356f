use indoc::indoc;
use integration_tests::{TestServer, token};
use serde_json::json;

async fn statuses(server: &TestServer, path: &str, forwarded_for: Option<&str>, count: usize) -> Vec<u16> {
    let mut statuses = Vec::with_capacity(count);

    for _ in 0..count {
        let mut request = server.client.request(reqwest::Method::GET, path);

        if let Some(ip) = forwarded_for {
            request = request.header("X-Forwarded-For", ip);
        }

        statuses.push(request.send().await.unwrap().status().as_u16());
    }

    statuses
}

#[tokio::test]
async fn burst_without_refill() {
    let config = indoc! {r#"
        [server.rate_limits]
        rate = 0.0
        burst = 3
    "#};

    let server = TestServer::builder().build(config).await;

    assert_eq!(statuses(&server, "/public/holidays", None, 4).await, [200, 200, 200, 429]);

    let response = server.client.get("/public/holidays").await;

    assert_eq!(response.status(), 429);
    assert!(response.headers().get("retry-after").is_none());

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"error":"rate limit exceeded"}"#);
}

#[tokio::test]
async fn forwarded_clients_have_their_own_buckets() {
    let config = indoc! {r#"
        [server.rate_limits]
        rate = 0.0
        burst = 2
        trust_forwarded_headers = true
    "#};

    let server = TestServer::builder().build(config).await;

    let results = json!({
        "192.168.1.1": statuses(&server, "/public/holidays", Some("192.168.1.1"), 3).await,
        "192.168.1.2": statuses(&server, "/public/holidays", Some("192.168.1.2, 10.0.0.1"), 3).await,
    });

    insta::assert_json_snapshot!(results, @r#"
    {
      "192.168.1.1": [
        200,
        200,
        429
      ],
      "192.168.1.2": [
        200,
        200,
        429
      ]
    }
    "#);
}

#[tokio::test]
async fn forwarded_headers_are_ignored_unless_trusted() {
    let config = indoc! {r#"
        [server.rate_limits]
        rate = 0.0
        burst = 2
    "#};

    let server = TestServer::builder().build(config).await;

    // Both claim to be different clients, but share the peer address.
    let first = statuses(&server, "/public/holidays", Some("192.168.1.1"), 2).await;
    let second = statuses(&server, "/public/holidays", Some("192.168.1.2"), 1).await;

    assert_eq!(first, [200, 200]);
    assert_eq!(second, [429]);
}

#[tokio::test]
async fn limits_apply_before_authentication() {
    let config = indoc! {r#"
        [server.rate_limits]
        rate = 0.0
        burst = 2
    "#};

    let server = TestServer::builder().build(config).await;

    // Unauthenticated attempts spend tokens too.
    assert_eq!(statuses(&server, "/api/me", None, 2).await, [401, 401]);

    let response = server.client.get_with_token("/api/me", &token("emp-1", "employee")).await;

    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn bucket_refills_over_time() {
    let config = indoc! {r#"
        [server.rate_limits]
        rate = 20.0
        burst = 1
    "#};

    let server = TestServer::builder().build(config).await;

    assert_eq!(statuses(&server, "/public/holidays", None, 2).await, [200, 429]);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert_eq!(statuses(&server, "/public/holidays", None, 1).await, [200]);
}

#[tokio::test]
async fn rate_limiting_disabled() {
    let config = indoc! {r#"
        [server.rate_limits]
        enabled = false
    "#};

    let server = TestServer::builder().build(config).await;
    let statuses = statuses(&server, "/public/holidays", None, 20).await;

    assert!(statuses.iter().all(|status| *status == 200));
}
