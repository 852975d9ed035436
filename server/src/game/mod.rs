pub mod logic;
pub mod scoring;
pub mod session;
pub mod types;
