// src/handlers/mod.rs
pub mod pricing_handler;
pub mod ride_handler;
pub mod route_handler;
