pub mod benchmarking;
pub mod config;
pub mod policies;
pub mod simulation;
pub mod validation;
