pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod notify;
pub mod registry;
pub mod status;
pub mod terminal;
