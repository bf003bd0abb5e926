//! Mediator: analysis and neutralization of messages between co-parents in
//! high-conflict separations.
//!
//! A draft is scanned against a fixed Portuguese rule table, classified by
//! severity and tone, and rewritten into a safer equivalent. A remote
//! generative classifier is used when configured, with the local rule-based
//! analyzer as a total fallback. Analysis of a draft being typed is debounced
//! so that only the latest edit's result is ever shown.

pub mod analyzer;
pub mod composer;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod filter;
pub mod guidance;
pub mod models;
pub mod neutralizer;
pub mod phrases;
pub mod pipeline;
pub mod rules;
pub mod web;
