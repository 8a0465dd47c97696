//! Python source indexing: parsing, doc-comment detection, canonical body
//! rendering, and the parallel tree walk.

pub mod canonical;
pub mod docstring;
pub mod filesystem;
pub mod functions;
pub mod parser;
pub mod pipeline;
