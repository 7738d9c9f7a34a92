pub mod auth;
pub mod files;
pub mod routes;
pub mod status;
