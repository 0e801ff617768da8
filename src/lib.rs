//! Patient-friendly clinical trial finder.
//!
//! Searches ClinicalTrials.gov, keeps recruiting trials, floats those near the
//! patient to the top, and asks a chat-completions endpoint for a short summary.

pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod render;
pub mod sources;
pub mod transform;
