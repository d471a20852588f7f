//! Request handlers

pub mod authorization;
pub mod data;
pub mod health;
