pub mod core;
pub mod output;
pub mod scraping;

// --- Primary core exports ---
pub use core::config;
pub use core::types;
pub use core::types::*;

pub use scraping::{browser_manager, dropdown, extract, filters, session};
