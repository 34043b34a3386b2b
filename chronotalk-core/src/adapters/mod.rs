//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Directory of JSON files for the DurableStore port
//! - In-process shared medium for the DurableStore port (tests, demos)
//! - Gemini HTTP client for TextGenerator

pub mod file;
pub mod gemini;
pub mod memory;
