pub mod args;
pub mod commands;
mod config;
mod error;
pub mod interval;
pub mod model;
pub mod persistence;
pub mod predicate;
pub mod ranking;
pub mod rates;
pub mod reducers;
pub mod store;
mod utils;
pub mod walker;

#[cfg(test)]
mod test;

pub use config::Config;
pub use error::EntityKind;
pub use error::Error;
pub use error::Result;
