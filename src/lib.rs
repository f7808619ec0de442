//! Discovery Server Library
//!
//! Similar-artist discovery: a web page backed by a music catalog API and a
//! chat-completions model. This library exposes the internal modules for
//! testing and potential reuse.

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod llm;
pub mod secrets;
pub mod server;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use discovery::{DiscoveryPipeline, DiscoveryServices};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
