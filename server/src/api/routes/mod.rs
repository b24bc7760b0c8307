//! API route handlers

pub mod cache;
pub mod catalog;
pub mod health;
