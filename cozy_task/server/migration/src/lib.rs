pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_tasks_and_users;
mod m20250412_000001_create_routines;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_tasks_and_users::Migration),
            Box::new(m20250412_000001_create_routines::Migration),
        ]
    }
}
