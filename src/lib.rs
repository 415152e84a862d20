//! Marketplace backend: accounts, geo-ranked retail feed, price comparison,
//! wholesale tier pricing and buyer save/view tracking over a JSON API.

pub mod auth;
pub mod config;
pub mod database;
pub mod dtos;
pub mod error;
pub mod feed;
pub mod geo;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod tiers;
