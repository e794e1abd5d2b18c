//! Service-level abstractions shared by the memoization engine.

pub mod hash;
