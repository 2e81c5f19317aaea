pub mod agent;
pub mod config;
pub mod error;
pub mod fragment;
pub mod group;
pub mod message;
pub mod trace;

pub use error::{Error, Result};
