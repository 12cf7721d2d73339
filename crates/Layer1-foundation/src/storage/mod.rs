//! Storage module for RoleForge
//!
//! - `db`: SQLite - 권한/역할/할당 영속 데이터
//! - `json`: JSON - 설정 파일 읽기

mod db;
mod json;

// SQLite Storage (RBAC 데이터)
pub use db::{AssignmentRecord, RoleRecord, StoredState, Storage, DATABASE_FILE};

// JSON Storage (설정)
pub use json::JsonStore;
