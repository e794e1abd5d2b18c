//! Memoization engine and port trait definitions for Memoria.
//!
//! This crate defines the "ports" (storage and hashing traits) that the
//! infrastructure layer implements, plus the memoization engine built on top
//! of them. It depends only on `memoria-types` -- never on `memoria-infra` or
//! any database/IO crate.

pub mod cache;
pub mod memo;
pub mod service;
