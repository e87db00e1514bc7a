// src/models/mod.rs
pub mod ride;
pub mod route;
pub mod user;

pub use ride::*;
pub use route::*;
pub use user::*;
