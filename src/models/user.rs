// src/models/user.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    Driver,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    NormalCar,   // Standard unmarked car
    AcCar,       // Air-conditioned car
    PublicCar,   // Shared public taxi
    Vip,         // Luxury vehicle
    Microbus,    // Small bus for groups
    Motorcycle,  // Single-passenger bike
}

impl VehicleType {
    pub const ALL: [VehicleType; 6] = [
        VehicleType::NormalCar,
        VehicleType::AcCar,
        VehicleType::PublicCar,
        VehicleType::Vip,
        VehicleType::Microbus,
        VehicleType::Motorcycle,
    ];
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Vehicle {
    pub model: String,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Driver {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub vehicle: Vehicle,
    pub rating: f32,     // Average rating (0-5)
    pub is_online: bool,
}
