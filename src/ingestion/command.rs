//! command.rs
//! Steering command carried from the input side to the control loop.
//! - network payloads are UTF-8 JSON objects with integer `speed` and `angle`
//! - integral floats (`100.0`) are truncated, anything else is a decode error

use serde::{Deserialize, Deserializer, de::Error as _};
use thiserror::Error;

/// Neutral speed used at start-up and after shutdown.
pub const NEUTRAL_SPEED: i32 = 0;
/// Neutral (straight ahead) angle used at start-up.
pub const NEUTRAL_ANGLE: i32 = 90;

/// Most recent fully decoded (speed, angle) pair, still in raw input scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Command {
    #[serde(deserialize_with = "integral")]
    pub speed: i32,
    #[serde(deserialize_with = "integral")]
    pub angle: i32,
}

impl Command {
    pub const fn new(speed: i32, angle: i32) -> Self {
        Self { speed, angle }
    }
}

impl Default for Command {
    fn default() -> Self {
        Self::new(NEUTRAL_SPEED, NEUTRAL_ANGLE)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not a command object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one datagram into a command. One payload is one complete command.
pub fn decode_payload(payload: &[u8]) -> Result<Command, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str(text.trim())?)
}

// Accepts JSON integers, and floats truncated toward zero, clamped into i32.
fn integral<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(v) = value.as_i64() {
        return Ok(v.clamp(i32::MIN as i64, i32::MAX as i64) as i32);
    }
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32),
        _ => Err(D::Error::custom(format!("{value} is not a usable integer"))),
    }
}
