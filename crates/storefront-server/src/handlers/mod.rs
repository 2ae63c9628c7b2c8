//! HTTP request handlers

pub mod health;
pub mod heavy;
pub mod user;

pub use health::*;
pub use heavy::*;
pub use user::*;
