//! API handlers

pub mod auth;
pub mod chirps;
pub mod health;
pub mod webhook;
