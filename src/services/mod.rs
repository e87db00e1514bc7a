// src/services/mod.rs
pub mod fare_meter;
pub mod location_service;
pub mod navigation_service;
pub mod pricing_service;
pub mod ride_service;
pub mod route_service;
