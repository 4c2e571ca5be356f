use indoc::indoc;
use integration_tests::TestServer;
use reqwest::Method;

#[tokio::test]
async fn no_cors_headers_by_default() {
    let server = TestServer::builder().build("").await;

    let response = server
        .client
        .request(Method::GET, "/public/holidays")
        .header("Origin", "https://hr.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn allowed_origin() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = ["https://hr.example.com", "https://*.intranet.example.com"]
        allow_credentials = true
    "#};

    let server = TestServer::builder().build(config).await;

    let mut results = Vec::new();

    for origin in [
        "https://hr.example.com",
        "https://payroll.intranet.example.com",
        "https://evil.example.org",
    ] {
        let response = server
            .client
            .request(Method::GET, "/public/holidays")
            .header("Origin", origin)
            .send()
            .await
            .unwrap();

        let allowed = response
            .headers()
            .get("access-control-allow-origin")
            .map(|value| value.to_str().unwrap().to_string());

        results.push((origin, allowed));
    }

    insta::assert_debug_snapshot!(results, @r#"
    [
        (
            "https://hr.example.com",
            Some(
                "https://hr.example.com",
            ),
        ),
        (
            "https://payroll.intranet.example.com",
            Some(
                "https://payroll.intranet.example.com",
            ),
        ),
        (
            "https://evil.example.org",
            None,
        ),
    ]
    "#);
}

#[tokio::test]
async fn preflight_for_authenticated_route() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = "*"
        allow_methods = ["GET", "POST"]
        allow_headers = ["authorization", "content-type"]
        max_age = "1h"
    "#};

    let server = TestServer::builder().build(config).await;

    // Preflights carry no credentials and are answered before authentication.
    let response = server
        .client
        .request(Method::OPTIONS, "/api/me")
        .header("Origin", "https://hr.example.com")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "authorization")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let headers = response.headers();

    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET,POST,OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "authorization,content-type");
    assert_eq!(headers["access-control-max-age"], "3600");
}
