pub mod classify;
pub mod cli;
pub mod driver;
pub mod error;
pub mod explorer;
pub mod orchestrator;
pub mod report;
pub mod screen;
pub mod state;
pub mod strategy;
pub mod trace;
pub mod transport;

pub use error::CrawlError;
