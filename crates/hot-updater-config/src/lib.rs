// crates/hot-updater-config/src/lib.rs
// ============================================================================
// Module: Hot Updater Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for hot-updater.toml semantics.
// Dependencies: hot-updater-store-sqlite, hot-updater-store-postgres, serde, toml
// ============================================================================

//! ## Overview
//! `hot-updater-config` defines the configuration model for the update
//! server. Loading is strict and fail-closed; the validated value is passed
//! explicitly to the server at construction.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
