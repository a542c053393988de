use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::config;
use crate::database::models::{Project, Task, TaskPriority, TaskStatus, Tenant, User};
use crate::database::{DatabaseManager, Stores};
use crate::tenancy::TenantId;
use crate::types::{Plan, Role};

pub const SUPER_ADMIN_EMAIL: &str = "superadmin@system.com";
pub const DEMO_SUBDOMAIN: &str = "demo";

/// What a seeding run actually inserted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub super_admin: bool,
    pub demo_tenant: bool,
}

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database).await?;
    DatabaseManager::migrate(&pool).await?;
    let report = seed_demo_data(&Stores::postgres(pool)).await?;

    output_success(
        output_format,
        "Seed complete",
        Some(json!({
            "superAdminCreated": report.super_admin,
            "demoTenantCreated": report.demo_tenant,
        })),
    )
}

/// Inserts the platform super admin and the `demo` tenant unless they
/// already exist. Safe to run repeatedly.
pub async fn seed_demo_data(stores: &Stores) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    if stores
        .users
        .find_user_by_email(None, SUPER_ADMIN_EMAIL)
        .await?
        .is_none()
    {
        let hash = hash_password("Admin@123")?;
        stores
            .users
            .insert_user(User::new(None, SUPER_ADMIN_EMAIL, hash, "System Super Admin", Role::SuperAdmin))
            .await?;
        report.super_admin = true;
    }

    if stores.tenants.find_by_subdomain(DEMO_SUBDOMAIN).await?.is_some() {
        tracing::info!("Demo tenant already present, skipping");
        return Ok(report);
    }

    let tenant = stores
        .tenants
        .insert_tenant(Tenant::new("Demo Company", DEMO_SUBDOMAIN, Plan::Pro))
        .await?;
    let tenant_id = tenant.id;

    let admin = insert_member(stores, &tenant_id, "admin@demo.com", "Demo Admin", "Demo@123", Role::TenantAdmin).await?;
    let user1 = insert_member(stores, &tenant_id, "user1@demo.com", "User One", "User@123", Role::TenantUser).await?;
    let user2 = insert_member(stores, &tenant_id, "user2@demo.com", "User Two", "User@123", Role::TenantUser).await?;

    let alpha = stores
        .projects
        .insert_project(Project::new(
            tenant_id.clone(),
            "Project Alpha",
            Some("First demo project".to_string()),
            Some(admin.email.clone()),
        ))
        .await?;
    let beta = stores
        .projects
        .insert_project(Project::new(
            tenant_id.clone(),
            "Project Beta",
            Some("Second demo project".to_string()),
            Some(admin.email),
        ))
        .await?;

    let tasks = [
        (alpha.id, "Setup Environment", TaskPriority::Low, user1.id),
        (alpha.id, "Design DB Schema", TaskPriority::High, user1.id),
        (beta.id, "Frontend Mockups", TaskPriority::Medium, user2.id),
    ];
    for (project_id, title, priority, assignee) in tasks {
        let now = Utc::now();
        stores
            .tasks
            .insert_task(Task {
                id: Uuid::new_v4(),
                project_id,
                tenant_id: tenant_id.clone(),
                title: title.to_string(),
                description: Some("Auto-generated task definition".to_string()),
                status: TaskStatus::Todo,
                priority,
                assigned_to: Some(assignee),
                due_date: Some((now + Duration::days(7)).date_naive()),
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    tracing::info!(tenant = %tenant_id, "Seeded demo tenant");
    report.demo_tenant = true;
    Ok(report)
}

async fn insert_member(
    stores: &Stores,
    tenant_id: &TenantId,
    email: &str,
    full_name: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<User> {
    let hash = hash_password(password)?;
    let user = User::new(Some(tenant_id.clone()), email, hash, full_name, role);
    Ok(stores.users.insert_user(user).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let stores = Stores::in_memory();

        let first = seed_demo_data(&stores).await.unwrap();
        assert!(first.super_admin && first.demo_tenant);

        let second = seed_demo_data(&stores).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let demo = stores.tenants.find_by_subdomain("demo").await.unwrap().unwrap();
        assert_eq!(demo.subscription_plan, Plan::Pro);
        assert_eq!(stores.users.count_users(&demo.id).await.unwrap(), 3);
        assert_eq!(stores.projects.count_projects(&demo.id).await.unwrap(), 2);
        assert_eq!(stores.tasks.list_tasks(&demo.id).await.unwrap().len(), 3);
    }
}
