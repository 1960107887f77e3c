//! Resource quantity validation
//!
//! Limits arrive as cluster quantity strings ("1", "500m", "512Mi", "1e3").
//! They are checked locally so a bad descriptor fails with a clear message
//! before the cluster is contacted. The raw text is what gets submitted.

use scicd_core::domain::pipeline::PodResources;

use crate::error::{OrchestrationError, Result};

/// A validated quantity
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    raw: String,
    value: f64,
}

impl Quantity {
    /// Parses a cluster quantity string
    ///
    /// Accepts an optional sign, a decimal number and one suffix: binary SI
    /// (`Ki`..`Ei`), decimal SI (`n`, `u`, `m`, `k`, `M`..`E`) or a decimal
    /// exponent (`e3`, `E-2`).
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        if raw.is_empty() {
            return Err("quantity is empty".to_string());
        }

        let (sign, unsigned) = match raw.as_bytes()[0] {
            b'-' => (-1.0, &raw[1..]),
            b'+' => (1.0, &raw[1..]),
            _ => (1.0, raw),
        };

        let number_len = unsigned
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(number_len);

        if !number.chars().any(|c| c.is_ascii_digit()) {
            return Err("missing numeric value".to_string());
        }
        if number.matches('.').count() > 1 {
            return Err("more than one decimal point".to_string());
        }

        let mantissa: f64 = number
            .parse()
            .map_err(|_| format!("'{}' is not a number", number))?;
        let multiplier = suffix_multiplier(suffix)?;

        let value = sign * mantissa * multiplier;
        if !value.is_finite() {
            return Err("value out of range".to_string());
        }

        Ok(Self {
            raw: raw.to_string(),
            value,
        })
    }

    /// The text as written in the descriptor
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Value in base units (cores for CPU, bytes for memory)
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Value in thousandths of a base unit, e.g. millicores
    pub fn millis(&self) -> i64 {
        (self.value * 1000.0).round() as i64
    }
}

fn suffix_multiplier(suffix: &str) -> std::result::Result<f64, String> {
    let multiplier = match suffix {
        "" => 1.0,
        "Ki" => 1024f64,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        _ => return exponent_multiplier(suffix),
    };
    Ok(multiplier)
}

fn exponent_multiplier(suffix: &str) -> std::result::Result<f64, String> {
    let exponent = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))
        .ok_or_else(|| format!("unknown suffix '{}'", suffix))?;

    let digits = exponent
        .strip_prefix('-')
        .or_else(|| exponent.strip_prefix('+'))
        .unwrap_or(exponent);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("unknown suffix '{}'", suffix));
    }

    let exponent: i32 = exponent
        .parse()
        .map_err(|_| format!("exponent '{}' out of range", exponent))?;
    Ok(10f64.powi(exponent))
}

/// CPU and memory limits that have passed validation
///
/// The pod builder only accepts this type, so an unvalidated limit can never
/// reach the cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    pub cpu: Quantity,
    pub memory: Quantity,
}

impl ResourceLimits {
    /// Validates the descriptor's `pod` section
    pub fn from_pod(pod: &PodResources) -> Result<Self> {
        Ok(Self {
            cpu: parse_limit("cpu", &pod.cpu)?,
            memory: parse_limit("memory", &pod.memory)?,
        })
    }
}

fn parse_limit(resource: &'static str, raw: &str) -> Result<Quantity> {
    let invalid = |reason: String| OrchestrationError::InvalidQuantity {
        resource,
        value: raw.to_string(),
        reason,
    };

    let quantity = Quantity::parse(raw).map_err(invalid)?;
    if quantity.value() < 0.0 {
        return Err(invalid("limits cannot be negative".to_string()));
    }
    Ok(quantity)
}
