//! Seeding - 권한/역할/principal 참조 데이터 적재

mod catalog;
mod seeder;

pub use catalog::{AssignmentSeed, RoleGrants, RoleSeed, SeedCatalog};
pub use seeder::{SeedReport, Seeder};
