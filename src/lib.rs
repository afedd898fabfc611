//! SE Ranking SEO API node: resource builders, a paced request helper and a
//! per-item dispatcher, served over stdio JSON-RPC by the binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod node;
pub mod params;
pub mod resources;
pub mod server;
pub mod validate;

pub use error::NodeError;
pub use node::{Node, OutputRecord};
