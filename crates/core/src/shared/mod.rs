pub mod candidate;
pub mod constants;
pub mod frame;
