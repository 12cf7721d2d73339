//! Config - 통합 설정 관리
//!
//! - `settings.rs` - RoleForgeConfig 통합 설정 + 시딩 정책

mod settings;

pub use settings::{RoleForgeConfig, SeedPolicy, CONFIG_FILE};
