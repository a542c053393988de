pub mod audit;
pub mod project;
pub mod task;
pub mod tenant;
pub mod user;

pub use audit::AuditEntry;
pub use project::{Project, ProjectWithStats};
pub use task::{Task, TaskCounts, TaskPriority, TaskStatus};
pub use tenant::{Tenant, TenantBranding, TenantUpdate};
pub use user::User;
