//! AI Knowledge Hub API
//!
//! A content-gated learning hub over an auth + data provider:
//! - Session-based sign-up / sign-in with admin approval of new accounts
//! - Per-session, time-boxed caching of content reads (articles, course modules
//!   and lessons, curated resources) with invalidation on writes
//! - Super-admin user lifecycle management: approve, reject, suspend,
//!   reactivate, delete, role changes, statistics and the activity log

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod provider;
pub mod routes;
pub mod services;
pub mod sessions;
pub mod state;
