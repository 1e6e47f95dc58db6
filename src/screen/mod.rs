pub mod capture;
pub mod snapshot;
