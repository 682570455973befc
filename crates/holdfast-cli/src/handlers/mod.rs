//! Command handlers - kept out of main.rs so they can be tested against the
//! in-memory browser

pub mod config;
pub mod inspect;

pub use config::execute_config;
pub use inspect::{inspect, parse_chain, InspectReport};
