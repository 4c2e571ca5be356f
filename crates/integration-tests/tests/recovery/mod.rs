use indoc::indoc;
use integration_tests::TestServer;

#[tokio::test]
async fn panicking_handler_returns_internal_error() {
    let config = indoc! {r#"
        [server.rate_limits]
        enabled = false
    "#};

    let server = TestServer::builder().build(config).await;

    let response = server.client.get("/public/panic").await;
    assert_eq!(response.status(), 500);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"error":"internal server error"}"#);

    // The server keeps serving, on the same connection pool and on the panicking route.
    assert_eq!(server.client.get("/public/holidays").await.status(), 200);
    assert_eq!(server.client.get("/public/panic").await.status(), 500);
    assert_eq!(server.client.get("/health").await.status(), 200);
}
