pub mod algorithm;
pub mod frontier;
pub mod model;
pub mod randomized;
