mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use saas_platform::database::models::{AuditEntry, Project};
use saas_platform::database::{AuditStore, DatabaseError, MemoryStore, ProjectStore, Stores};
use saas_platform::tenancy::TenantId;

/// Delegates everything except inserts, which fail.
struct RefusingProjects(Arc<MemoryStore>);

#[async_trait]
impl ProjectStore for RefusingProjects {
    async fn insert_project(&self, _project: Project) -> Result<Project, DatabaseError> {
        Err(DatabaseError::Unavailable("disk full".to_string()))
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        self.0.find_project(id).await
    }

    async fn find_project_in_tenant(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        self.0.find_project_in_tenant(tenant, id).await
    }

    async fn list_projects(&self, tenant: &TenantId) -> Result<Vec<Project>, DatabaseError> {
        self.0.list_projects(tenant).await
    }

    async fn list_all_projects(&self) -> Result<Vec<Project>, DatabaseError> {
        self.0.list_all_projects().await
    }

    async fn count_projects(&self, tenant: &TenantId) -> Result<i64, DatabaseError> {
        self.0.count_projects(tenant).await
    }

    async fn update_project(&self, tenant: &TenantId, project: &Project) -> Result<Option<Project>, DatabaseError> {
        self.0.update_project(tenant, project).await
    }

    async fn delete_project(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        self.0.delete_project(tenant, id).await
    }
}

struct BrokenAudit;

#[async_trait]
impl AuditStore for BrokenAudit {
    async fn append_audit(&self, _entry: AuditEntry) -> Result<(), DatabaseError> {
        Err(DatabaseError::Unavailable("audit table locked".to_string()))
    }

    async fn list_audit(&self, _tenant: &TenantId, _limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
        Ok(Vec::new())
    }
}

fn memory_stores() -> (Arc<MemoryStore>, Stores) {
    let memory = Arc::new(MemoryStore::new());
    let stores = Stores {
        tenants: memory.clone(),
        users: memory.clone(),
        projects: memory.clone(),
        tasks: memory.clone(),
        audit: memory.clone(),
    };
    (memory, stores)
}

#[tokio::test]
async fn test_mutations_are_recorded_for_the_tenant() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let globex = server.register("globex").await?;
    let project = server.create_project(&acme.token, "Audited").await?;
    server
        .put(
            &format!("/api/projects/{}", project),
            Some(&acme.token),
            json!({ "status": "archived" }),
        )
        .await?;

    let (status, body) = server.get("/api/audit-logs", Some(&acme.token)).await?;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["action"], "UPDATE_PROJECT");
    assert_eq!(entries[1]["action"], "CREATE_PROJECT");
    assert_eq!(entries[1]["tenantId"], acme.id.as_str());
    assert_eq!(entries[1]["actor"], acme.admin_email.as_str());
    assert_eq!(entries[2]["action"], "TENANT_REGISTRATION");

    let (_, body) = server.get("/api/audit-logs", Some(&globex.token)).await?;
    let entries = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "TENANT_REGISTRATION");

    let (_, body) = server.get("/api/audit-logs?limit=1", Some(&acme.token)).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_entry_survives_a_failed_write() -> Result<()> {
    let (memory, mut stores) = memory_stores();
    stores.projects = Arc::new(RefusingProjects(memory));
    let server = common::TestServer::start_with(stores).await?;
    let acme = server.register("acme").await?;

    let (status, body) = server
        .post("/api/projects", Some(&acme.token), json!({ "name": "Doomed" }))
        .await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    let (_, body) = server.get("/api/audit-logs", Some(&acme.token)).await?;
    let entries = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "CREATE_PROJECT");
    Ok(())
}

#[tokio::test]
async fn test_registration_on_another_tenants_host_stays_out_of_its_log() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;

    let request = server
        .request(Method::POST, "/api/auth/register", None)
        .header("Host", format!("acme.example.com:{}", server.port))
        .json(&json!({
            "tenantName": "Globex Inc",
            "subdomain": "globex",
            "adminEmail": "admin@globex.test",
            "adminPassword": common::ADMIN_PASSWORD,
            "adminFullName": "Tenant Admin",
        }));
    let (status, body) = server.send(request).await?;
    assert_eq!(status, StatusCode::CREATED);
    let globex_id = body["data"]["tenantId"].as_str().unwrap_or_default().to_string();

    let (_, body) = server.get("/api/audit-logs", Some(&acme.token)).await?;
    let entries = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["tenantId"], acme.id.as_str());

    let globex = server
        .login(Some("globex"), "admin@globex.test", common::ADMIN_PASSWORD)
        .await?;
    let (_, body) = server.get("/api/audit-logs", Some(&globex)).await?;
    let entries = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "TENANT_REGISTRATION");
    assert_eq!(entries[0]["tenantId"], globex_id.as_str());
    assert_eq!(entries[0]["actor"], "admin@globex.test");
    Ok(())
}

#[tokio::test]
async fn test_broken_audit_store_does_not_fail_requests() -> Result<()> {
    let (_, mut stores) = memory_stores();
    stores.audit = Arc::new(BrokenAudit);
    let server = common::TestServer::start_with(stores).await?;
    let acme = server.register("acme").await?;

    let project = server.create_project(&acme.token, "Unaudited").await?;
    let (status, _) = server
        .get(&format!("/api/projects/{}", project), Some(&acme.token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_audit_log_is_admin_only() -> Result<()> {
    let server = common::TestServer::start().await?;
    let acme = server.register("acme").await?;
    let (_, member) = server.add_member(&acme, "member@acme.test").await?;

    let (status, _) = server.get("/api/audit-logs", Some(&member)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
