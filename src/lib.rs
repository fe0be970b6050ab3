pub mod app;
pub mod auth;
pub mod chat;
pub mod platform;
pub mod storage;
pub mod error;

pub use error::{Error, Result};
