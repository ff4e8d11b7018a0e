use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount {0}")]
    Malformed(String),
    #[error("amount {text} has more than {decimals} fractional digits")]
    TooPrecise { text: String, decimals: u8 },
    #[error("amount {0} exceeds the maximum uint256 value")]
    Overflow(String),
    #[error("unknown unit {0}")]
    UnknownUnit(String),
}

/// Parse a decimal string into an integer scaled by `10^decimals`.
///
/// The conversion is purely textual: the fractional digits are right-padded
/// to `decimals` and concatenated with the integer part, so no rounding
/// ever happens.
pub fn parse_units(text: &str, decimals: u8) -> Result<U256, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };
    if !is_canonical_integer(int_part) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::Malformed(text.to_string()));
    }
    if frac_part.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            text: text.to_string(),
            decimals,
        });
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.extend(std::iter::repeat('0').take(decimals as usize - frac_part.len()));

    U256::from_str_radix(&digits, 10).map_err(|_| AmountError::Overflow(text.to_string()))
}

/// Render an integer scaled by `10^decimals` as a decimal string with
/// trailing fractional zeros removed.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let (int_part, frac_part) = if digits.len() <= decimals {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    } else {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    };

    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part
    } else {
        format!("{int_part}.{frac_part}")
    }
}

fn is_canonical_integer(text: &str) -> bool {
    match text.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        bytes => bytes.iter().all(|b| b.is_ascii_digit()),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Major,
    Minor,
}

/// Unit names and exponent of the chain's native coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Denomination {
    pub major: String,
    pub minor: String,
    pub decimals: u8,
}

impl Default for Denomination {
    fn default() -> Self {
        Self {
            major: "ETH".to_string(),
            minor: "WEI".to_string(),
            decimals: 18,
        }
    }
}

impl Denomination {
    pub fn newchain() -> Self {
        Self {
            major: "NEW".to_string(),
            minor: "ISAAC".to_string(),
            decimals: 18,
        }
    }

    pub fn parse_unit(&self, text: &str) -> Result<Unit, AmountError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case(&self.major) {
            Ok(Unit::Major)
        } else if text.eq_ignore_ascii_case(&self.minor) {
            Ok(Unit::Minor)
        } else {
            Err(AmountError::UnknownUnit(text.to_string()))
        }
    }

    pub fn unit_name(&self, unit: Unit) -> &str {
        match unit {
            Unit::Major => &self.major,
            Unit::Minor => &self.minor,
        }
    }

    pub fn exponent(&self, unit: Unit) -> u8 {
        match unit {
            Unit::Major => self.decimals,
            Unit::Minor => 0,
        }
    }

    pub fn to_minor(&self, text: &str, unit: Unit) -> Result<U256, AmountError> {
        parse_units(text, self.exponent(unit))
    }

    pub fn format(&self, value: U256, unit: Unit) -> String {
        format_units(value, self.exponent(unit))
    }

    /// Format with the unit name appended. Without an explicit unit, small
    /// values are shown in the minor unit.
    pub fn format_auto(&self, value: U256, unit: Option<Unit>) -> String {
        let unit = unit.unwrap_or_else(|| {
            if value.to_string().len() <= self.decimals as usize {
                Unit::Minor
            } else {
                Unit::Major
            }
        });
        format!("{} {}", self.format(value, unit), self.unit_name(unit))
    }
}
