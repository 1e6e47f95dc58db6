pub mod address;
pub mod page;
