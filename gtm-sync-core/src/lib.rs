//! gtm-sync-core: engines for cross-account tag-management synchronisation.
//!
//! This crate contains the entity model, the remote client contract and the
//! three engines (copy, diff, reset) plus the rate-limited batch runner
//! they all share. No terminal rendering or HTTP transport lives here; the
//! CLI crate provides both against the [`contract::TagManagerClient`]
//! trait.
//!
//! # Usage
//! Fetch each account into an [`store::EntityStore`], then hand the stores
//! to [`copy::CopyEngine`], [`diff::DiffEngine`] or [`reset::ResetEngine`].

pub mod batch;
pub mod config;
pub mod contract;
pub mod copy;
pub mod diff;
pub mod error;
pub mod model;
pub mod reset;
pub mod store;
