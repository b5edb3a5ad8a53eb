pub mod bootstrap;
pub mod commands;
pub mod obs;
pub mod server;
