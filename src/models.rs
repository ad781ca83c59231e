pub mod auth;
pub mod warehouse;
