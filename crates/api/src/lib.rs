//! Okra API library.
//!
//! This crate provides the REST backend as a library, allowing route
//! handlers, services, and stores to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
