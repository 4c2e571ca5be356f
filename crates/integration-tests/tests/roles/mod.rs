use indoc::indoc;
use integration_tests::{TestServer, token};
use serde_json::json;

const NO_RATE_LIMITS: &str = indoc! {r#"
    [server.rate_limits]
    enabled = false
"#};

#[tokio::test]
async fn approvals_for_admins_and_managers() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;

    let mut results = Vec::new();

    for role in ["admin", "manager", "employee"] {
        let response = server
            .client
            .get_with_token("/api/approvals", &token(&format!("{role}-1"), role))
            .await;

        results.push(json!({
            "role": role,
            "status": response.status().as_u16(),
            "body": response.text().await.unwrap(),
        }));
    }

    insta::assert_json_snapshot!(results, @r#"
    [
      {
        "body": "{\"approver\":\"admin-1\",\"pending\":3}",
        "role": "admin",
        "status": 200
      },
      {
        "body": "{\"approver\":\"manager-1\",\"pending\":3}",
        "role": "manager",
        "status": 200
      },
      {
        "body": "{\"error\":\"forbidden\"}",
        "role": "employee",
        "status": 403
      }
    ]
    "#);
}

#[tokio::test]
async fn roles_are_flat() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;

    let admin = server
        .client
        .get_with_token("/api/admin/payroll", &token("admin-1", "admin"))
        .await;

    assert_eq!(admin.status(), 200);

    // Managers rank above employees, but no role implies another.
    let manager = server
        .client
        .get_with_token("/api/admin/payroll", &token("manager-1", "manager"))
        .await;

    assert_eq!(manager.status(), 403);
}

#[tokio::test]
async fn authentication_is_checked_before_roles() {
    let server = TestServer::builder().build(NO_RATE_LIMITS).await;

    let response = server.client.get("/api/admin/payroll").await;

    assert_eq!(response.status(), 401);
}
