mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_other_tenants_project_is_invisible() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let globex = server.register("globex").await?;
    let project = server.create_project(&acme.token, "Acme Only").await?;
    let path = format!("/api/projects/{}", project);

    let (status, _) = server.get(&path, Some(&globex.token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .put(&path, Some(&globex.token), json!({ "name": "Hijacked" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.delete(&path, Some(&globex.token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.get(&path, Some(&acme.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme Only");
    Ok(())
}

#[tokio::test]
async fn test_cross_tenant_user_changes_are_forbidden() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let globex = server.register("globex").await?;
    let (member, _) = server.add_member(&acme, "member@acme.test").await?;
    let path = format!("/api/users/{}", member);

    let (status, body) = server
        .put(&path, Some(&globex.token), json!({ "fullName": "Pwned" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(common::error_code(&body), Some("FORBIDDEN"));

    let (status, _) = server.delete(&path, Some(&globex.token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .get(&format!("/api/tenants/{}/users", acme.id), Some(&acme.token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_tenant_paths_are_pinned_to_the_token() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let globex = server.register("globex").await?;

    let (status, _) = server
        .get(&format!("/api/tenants/{}", acme.id), Some(&globex.token))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .get(&format!("/api/tenants/{}/users", acme.id), Some(&globex.token))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .post(
            &format!("/api/tenants/{}/users", acme.id),
            Some(&globex.token),
            json!({ "email": "spy@globex.test", "password": "Spy@12345", "fullName": "Spy" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .get(&format!("/api/tenants/{}", acme.id), Some(&acme.token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["totalUsers"], 1);
    Ok(())
}

#[tokio::test]
async fn test_tasks_follow_project_ownership() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let globex = server.register("globex").await?;
    let project = server.create_project(&acme.token, "Board").await?;

    let (status, body) = server
        .post(
            &format!("/api/projects/{}/tasks", project),
            Some(&acme.token),
            json!({ "title": "Ship it", "priority": "high" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let task = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = server
        .post(
            &format!("/api/projects/{}/tasks", project),
            Some(&globex.token),
            json!({ "title": "Intruder" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .patch(
            &format!("/api/tasks/{}/status", task),
            Some(&globex.token),
            json!({ "status": "completed" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.get("/api/tasks", Some(&globex.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let (status, body) = server
        .patch(
            &format!("/api/tasks/{}/status", task),
            Some(&acme.token),
            json!({ "status": "completed" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    Ok(())
}
