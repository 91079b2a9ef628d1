use sea_orm_migration::prelude::*;

mod m20260801_000001_create_verification_codes;
mod m20260801_000002_create_magic_links;
mod m20260801_000003_create_approval_tokens;
mod m20260801_000004_create_approval_decisions;
mod m20260801_000005_create_login_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_verification_codes::Migration),
            Box::new(m20260801_000002_create_magic_links::Migration),
            Box::new(m20260801_000003_create_approval_tokens::Migration),
            Box::new(m20260801_000004_create_approval_decisions::Migration),
            Box::new(m20260801_000005_create_login_events::Migration),
        ]
    }
}
