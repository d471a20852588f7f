//! Request and response bodies

pub mod authorization;
pub mod data;
