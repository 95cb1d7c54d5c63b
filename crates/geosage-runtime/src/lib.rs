//! Runtime — location extraction pipeline, resolution strategies, status aggregation.
//!
//! `LocationPipeline` drives one document through NER, the location cache,
//! budgeted live geocoding and the selected resolution strategy, and bills
//! the caller's usage counters.

pub mod pipeline;
pub mod status;
pub mod strategy;

pub use pipeline::{LanguageOutput, LocationPipeline};
pub use status::{bill, worst};
pub use strategy::{Resolution, ResolveFn, StrategyExt};
