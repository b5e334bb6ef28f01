pub mod batch;
pub mod output;
pub mod stl;
pub mod store;
