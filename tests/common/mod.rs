#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use saas_platform::cli::commands::seed::seed_demo_data;
use saas_platform::config::AppConfig;
use saas_platform::database::Stores;
use saas_platform::state::AppState;

pub const ADMIN_PASSWORD: &str = "Admin@12345";

/// App served in-process on a free port, backed by `stores`.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub stores: Stores,
    client: reqwest::Client,
}

/// A freshly registered tenant and a logged-in token for its admin.
#[derive(Debug, Clone)]
pub struct TenantHandle {
    pub id: String,
    pub subdomain: String,
    pub admin_email: String,
    pub token: String,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(Stores::in_memory()).await
    }

    /// Also loads the demo data, which includes the platform super admin.
    pub async fn start_seeded() -> Result<Self> {
        let stores = Stores::in_memory();
        seed_demo_data(&stores).await?;
        Self::start_with(stores).await
    }

    pub async fn start_with(stores: Stores) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = AppState::new(AppConfig::for_tests(), stores.clone())?;
        let app = saas_platform::app(state);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            stores,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request builder with an optional bearer token.
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, Value)> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(self.request(Method::GET, path, token)).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(self.request(Method::POST, path, token).json(&body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(self.request(Method::PUT, path, token).json(&body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(self.request(Method::PATCH, path, token).json(&body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(self.request(Method::DELETE, path, token)).await
    }

    pub async fn login(&self, subdomain: Option<&str>, email: &str, password: &str) -> Result<String> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(subdomain) = subdomain {
            body["tenantSubdomain"] = json!(subdomain);
        }
        let (status, body) = self.post("/api/auth/login", None, body).await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response carries no token")
    }

    pub async fn super_admin_token(&self) -> Result<String> {
        self.login(None, "superadmin@system.com", "Admin@123").await
    }

    /// Registers `subdomain` on the free plan and logs its admin in.
    pub async fn register(&self, subdomain: &str) -> Result<TenantHandle> {
        let admin_email = format!("admin@{}.test", subdomain);
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "tenantName": format!("{} Inc", subdomain),
                    "subdomain": subdomain,
                    "adminEmail": admin_email,
                    "adminPassword": ADMIN_PASSWORD,
                    "adminFullName": "Tenant Admin",
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        let id = body["data"]["tenantId"]
            .as_str()
            .context("register response carries no tenantId")?
            .to_string();
        let token = self.login(Some(subdomain), &admin_email, ADMIN_PASSWORD).await?;

        Ok(TenantHandle {
            id,
            subdomain: subdomain.to_string(),
            admin_email,
            token,
        })
    }

    /// Adds a member with the `user` role and returns (user id, token).
    pub async fn add_member(&self, tenant: &TenantHandle, email: &str) -> Result<(String, String)> {
        let password = "Member@1234";
        let (status, body) = self
            .post(
                &format!("/api/tenants/{}/users", tenant.id),
                Some(&tenant.token),
                json!({ "email": email, "password": password, "fullName": "Member" }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "add member failed: {} {}", status, body);

        let id = body["data"]["id"].as_str().context("user id missing")?.to_string();
        let token = self.login(Some(&tenant.subdomain), email, password).await?;
        Ok((id, token))
    }

    /// Creates a project and returns its id.
    pub async fn create_project(&self, token: &str, name: &str) -> Result<String> {
        let (status, body) = self
            .post("/api/projects", Some(token), json!({ "name": name }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create project failed: {} {}", status, body);
        Ok(body["data"]["id"].as_str().context("project id missing")?.to_string())
    }
}

pub fn error_code(body: &Value) -> Option<&str> {
    body["code"].as_str()
}
