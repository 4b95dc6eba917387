pub mod aggregate;
pub mod profile;
