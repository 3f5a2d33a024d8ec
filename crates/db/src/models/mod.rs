//! Row models for the settings schema.

pub mod settings_record;
pub mod tenant_member;
