//! Meal logging backend: resolves classifier food labels against a small
//! reference table, logs meals per user and aggregates their macros by day.

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod http;
pub mod meals;
pub mod nutrition;
pub mod photos;
pub mod state;
pub mod summary;
