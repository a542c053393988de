mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_reports_store_ok() -> Result<()> {
    let server = common::TestServer::start().await?;

    let (status, body) = server.get("/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server
        .request(reqwest::Method::GET, "/api/nothing-here", None)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
