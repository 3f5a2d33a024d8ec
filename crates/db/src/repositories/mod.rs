//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod member_repo;
pub mod settings_repo;

pub use member_repo::MemberRepo;
pub use settings_repo::SettingsRepo;
