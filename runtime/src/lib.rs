// Copyright 2026 Indices Contributors
// SPDX-License-Identifier: Apache-2.0

//! Global indices scraper: fetch, extract, persist and serve market index
//! quotes from a third-party financial site.
//!
//! This library crate exposes the core modules for integration testing.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod extraction;
pub mod model;
pub mod pipeline;
pub mod renderer;
pub mod rest;
pub mod store;
