mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_missing_principal_is_401() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;

    for path in [
        "/api/projects".to_string(),
        "/api/tasks".to_string(),
        "/api/auth/me".to_string(),
        "/api/audit-logs".to_string(),
        format!("/api/tenants/{}", acme.id),
    ] {
        let (status, body) = server.get(&path, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(common::error_code(&body), Some("UNAUTHORIZED"));
    }
    Ok(())
}

#[tokio::test]
async fn test_roles_outside_the_allow_list_are_403() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let (_, member) = server.add_member(&acme, "member@acme.test").await?;

    let (status, _) = server.get("/api/tenants", Some(&acme.token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .post(
            &format!("/api/tenants/{}/users", acme.id),
            Some(&member),
            json!({ "email": "x@acme.test", "password": "Xx@123456", "fullName": "X" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .put(
            &format!("/api/tenants/{}", acme.id),
            Some(&member),
            json!({ "name": "Renamed By Member" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // members may still manage projects
    let project = server.create_project(&member, "Member Project").await?;
    let (status, _) = server
        .delete(&format!("/api/projects/{}", project), Some(&member))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_super_admin_sees_all_tenants() -> Result<()> {
    let server = common::TestServer::start_seeded().await?;
    let root = server.super_admin_token().await?;
    let acme = server.register("acme").await?;

    let (status, body) = server.get("/api/tenants", Some(&root)).await?;
    assert_eq!(status, StatusCode::OK);
    let subdomains: Vec<&str> = body["data"]
        .as_array()
        .map(|all| all.iter().filter_map(|t| t["subdomain"].as_str()).collect())
        .unwrap_or_default();
    assert!(subdomains.contains(&"demo"));
    assert!(subdomains.contains(&"acme"));

    let (status, body) = server
        .put(
            &format!("/api/tenants/{}", acme.id),
            Some(&root),
            json!({ "status": "suspended" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "suspended");

    // suspended tenants can no longer sign in
    let (status, _) = server
        .post(
            "/api/auth/login",
            None,
            json!({
                "tenantSubdomain": "acme",
                "email": acme.admin_email,
                "password": common::ADMIN_PASSWORD,
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_tenant_admin_may_only_rename() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let path = format!("/api/tenants/{}", acme.id);

    let (status, body) = server
        .put(&path, Some(&acme.token), json!({ "name": "Acme Corporation" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme Corporation");

    let (status, _) = server
        .put(&path, Some(&acme.token), json!({ "status": "suspended" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_login_rejects_wrong_password() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;

    let (status, body) = server
        .post(
            "/api/auth/login",
            None,
            json!({
                "tenantSubdomain": "acme",
                "email": acme.admin_email,
                "password": "wrong-password",
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = server.post("/api/auth/logout", Some(&acme.token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
