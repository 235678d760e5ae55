pub mod app_error;
pub mod app_state;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod extractors;
pub mod guards;
pub mod middleware;
pub mod swagger;
