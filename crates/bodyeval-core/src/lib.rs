//! bodyeval core library: compare generated function bodies against a
//! reference tree.
//!
//! A run walks a gold and a prediction tree, extracts every documented
//! Python function from both, aligns them by (repository, path, name), and
//! scores each aligned pair with exact match, sentence BLEU and n-gram
//! overlap, plus a pooled corpus BLEU over all pairs. See
//! [`evaluate::evaluate`] for the entry point.

pub mod align;
pub mod config;
pub mod errors;
pub mod evaluate;
pub mod indexer;
pub mod models;
pub mod report;
pub mod scoring;
