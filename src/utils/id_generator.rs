// src/utils/id_generator.rs
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    User,
    Driver,
    Ride,
    Vehicle,
}

impl IdType {
    pub fn to_prefix(&self) -> &'static str {
        match self {
            IdType::User => "usr",
            IdType::Driver => "drv",
            IdType::Ride => "ride",
            IdType::Vehicle => "veh",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "usr" => Some(IdType::User),
            "drv" => Some(IdType::Driver),
            "ride" => Some(IdType::Ride),
            "veh" => Some(IdType::Vehicle),
            _ => None,
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_prefix())
    }
}

const HEX_ALPHABET: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];
const ALNUM_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub struct IdGenerator;

impl IdGenerator {
    /// Generate a unique ID with format: {prefix}-{YYMMDD}-{suffix}
    pub fn generate(id_type: IdType) -> String {
        Self::generate_with_timestamp(id_type, Utc::now())
    }

    /// Generate an ID with a specific timestamp (useful for testing)
    pub fn generate_with_timestamp(id_type: IdType, timestamp: DateTime<Utc>) -> String {
        let date_part = timestamp.format("%y%m%d").to_string();
        format!("{}-{}-{}", id_type.to_prefix(), date_part, Self::random_suffix())
    }

    /// Five random characters, alternating between a hex-leaning and an
    /// alphanumeric-leaning alphabet so ids stay visually distinct.
    fn random_suffix() -> String {
        if rand::random::<bool>() {
            format!("{}{}", nanoid!(3, &HEX_ALPHABET), nanoid!(2, &ALNUM_ALPHABET))
        } else {
            format!("{}{}", nanoid!(3, &ALNUM_ALPHABET), nanoid!(2, &HEX_ALPHABET))
        }
    }

    /// Split an ID into its components, returning None for anything that
    /// does not match the {prefix}-{YYMMDD}-{suffix} shape.
    pub fn parse_id(id: &str) -> Option<ParsedId> {
        let parts: Vec<&str> = id.split('-').collect();
        if parts.len() != 3 {
            return None;
        }

        let id_type = IdType::from_prefix(parts[0])?;
        let date_part = parts[1];
        let suffix = parts[2];

        // All-ASCII-digit check up front: it is the format contract, and it
        // keeps the byte slicing below away from char boundaries.
        if date_part.len() != 6
            || !date_part.chars().all(|c| c.is_ascii_digit())
            || suffix.len() != 5
        {
            return None;
        }

        let year = 2000 + date_part[0..2].parse::<i32>().ok()?;
        let month = date_part[2..4].parse::<u32>().ok()?;
        let day = date_part[4..6].parse::<u32>().ok()?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }

        Some(ParsedId {
            id_type,
            year,
            month,
            day,
            suffix: suffix.to_string(),
        })
    }

    /// Validate format, and type when one is expected.
    pub fn validate_id(id: &str, expected_type: Option<IdType>) -> bool {
        match Self::parse_id(id) {
            Some(parsed) => expected_type.is_none_or(|expected| parsed.id_type == expected),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedId {
    pub id_type: IdType,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub suffix: String,
}
