pub mod client;
pub mod diagnostics;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod state;
pub mod utils;
