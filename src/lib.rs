//! snaplink - a minimal, fast URL shortener.
//!
//! The core lives in [`services::store`] (code allocation, lookups, expiry)
//! and [`services::short_code`] (candidate generation); everything else is
//! plumbing around it: the HTTP surface in [`routes`], storage in [`db`],
//! and the expiry sweeper in [`jobs`].

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;
