use indoc::indoc;
use integration_tests::TestServer;

fn security_headers(response: &reqwest::Response) -> Vec<(String, String)> {
    [
        "x-content-type-options",
        "x-frame-options",
        "referrer-policy",
        "content-security-policy",
        "strict-transport-security",
    ]
    .into_iter()
    .filter_map(|name| {
        let value = response.headers().get(name)?;
        Some((name.to_string(), value.to_str().unwrap().to_string()))
    })
    .collect()
}

#[tokio::test]
async fn added_to_success_and_failure_responses() {
    let server = TestServer::builder().build("").await;

    let ok = server.client.get("/public/holidays").await;
    let unauthorized = server.client.get("/api/me").await;

    assert_eq!(ok.status(), 200);
    assert_eq!(unauthorized.status(), 401);
    assert_eq!(security_headers(&ok), security_headers(&unauthorized));

    insta::assert_debug_snapshot!(security_headers(&ok), @r#"
    [
        (
            "x-content-type-options",
            "nosniff",
        ),
        (
            "x-frame-options",
            "DENY",
        ),
        (
            "referrer-policy",
            "no-referrer",
        ),
        (
            "content-security-policy",
            "default-src 'none'; frame-ancestors 'none'",
        ),
    ]
    "#);
}

#[tokio::test]
async fn hsts_and_custom_policy() {
    let config = indoc! {r#"
        [server.security_headers]
        hsts_max_age = "365d"
        content_security_policy = "default-src 'self'"
    "#};

    let server = TestServer::builder().build(config).await;
    let response = server.client.get("/health").await;
    let headers = response.headers();

    assert_eq!(headers["strict-transport-security"], "max-age=31536000; includeSubDomains");
    assert_eq!(headers["content-security-policy"], "default-src 'self'");
}

#[tokio::test]
async fn disabled() {
    let config = indoc! {r#"
        [server.security_headers]
        enabled = false
    "#};

    let server = TestServer::builder().build(config).await;
    let response = server.client.get("/public/holidays").await;

    assert!(security_headers(&response).is_empty());
}
