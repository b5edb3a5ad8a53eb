pub mod environment;
pub mod policies;
pub mod prices;
pub mod simulation;
