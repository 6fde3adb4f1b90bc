//! Anime source library: catalog browsing, season/episode synthesis from
//! several metadata providers, and stream resolution against a
//! user-configured aggregator.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod source;
