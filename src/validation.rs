use crate::models::{Address, Amount, Hash};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid {0} hex: {1}")]
    InvalidHex(&'static str, String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub fn validate_address(address: &str) -> Result<Address, ValidationError> {
    Address::parse_path(address)
}

/// Parses a comma separated address filter. An empty string means no filter.
pub fn validate_address_list(raw: Option<&str>) -> Result<HashSet<Address>, ValidationError> {
    split_list(raw).map(validate_address).collect()
}

/// Parses a comma separated hash filter. An empty string means no filter.
pub fn validate_hash_list(raw: Option<&str>) -> Result<HashSet<Hash>, ValidationError> {
    split_list(raw).map(|hash| hash.parse()).collect()
}

pub fn validate_amount(raw: &str) -> Result<Amount, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidParameter(format!("amount must be a non-negative integer: {}", raw)))
}

pub fn validate_time_range(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
    if from > to {
        return Err(ValidationError::InvalidParameter(
            "persistedAtFrom must not be after persistedAtTo".to_string(),
        ));
    }
    Ok((from, to))
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
