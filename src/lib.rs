// src/lib.rs

//! linksweep library
//!
//! Discovers GitHub repositories via saved searches, ingests them into a
//! store, and crawls each one for goo.gl short links so remediation issues
//! can be filed before the shortener is sunset.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod store;
