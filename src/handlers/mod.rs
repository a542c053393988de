// handlers/mod.rs - Thin HTTP adapters over the services
//
// Handlers only extract, delegate and wrap. Authorization, tenant scoping,
// quota and audit all happen in the service called.

pub mod audit;
pub mod auth;
pub mod health;
pub mod projects;
pub mod public;
pub mod tasks;
pub mod tenants;
pub mod users;
