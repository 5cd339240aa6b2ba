pub mod config;
pub mod ensemble;
pub mod inference;
pub mod routes;
