//! Commands, queries and the buses that route them to services.

pub mod bus;
pub mod commands;
mod handlers;
pub mod queries;

pub use bus::{Command, CommandBus, CommandHandler, CommandProcessor, Query, QueryBus, QueryHandler};
