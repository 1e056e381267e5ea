//! Instance-size normalization factors.

use crate::error::{AttributionError, Result};

/// Fixed factors of `metal` sizes, equal to the largest same-family size.
const METAL_FACTORS: &[(&str, f64)] = &[
    ("a1", 32.0),
    ("c5", 192.0),
    ("c5d", 192.0),
    ("c5n", 144.0),
    ("c6g", 128.0),
    ("c6gd", 128.0),
    ("c6i", 256.0),
    ("i3", 128.0),
    ("i3en", 192.0),
    ("m5", 192.0),
    ("m5d", 192.0),
    ("m5dn", 192.0),
    ("m5n", 192.0),
    ("m5zn", 96.0),
    ("m6g", 128.0),
    ("m6gd", 128.0),
    ("m6i", 256.0),
    ("r5", 192.0),
    ("r5b", 192.0),
    ("r5d", 192.0),
    ("r5dn", 192.0),
    ("r5n", 192.0),
    ("r6g", 128.0),
    ("r6gd", 128.0),
    ("r6i", 256.0),
    ("x2gd", 128.0),
    ("z1d", 96.0),
];

/// Look up the family and normalization factor of an instance type.
///
/// `t3.large` → `("t3", 4.0)`, `m5.12xlarge` → `("m5", 96.0)`,
/// `r6g.metal` → `("r6g", 128.0)`.
///
/// # Errors
///
/// Returns `AttributionError::UnknownInstanceType` if the type is malformed or
/// its size is not recognized.
pub fn normalization_factor(instance_type: &str) -> Result<(String, f64)> {
    let unknown = || AttributionError::UnknownInstanceType(instance_type.to_string());

    let (family, size) = instance_type.split_once('.').ok_or_else(unknown)?;
    if family.is_empty() {
        return Err(unknown());
    }

    let factor = match size {
        "nano" => 0.25,
        "micro" => 0.5,
        "small" => 1.0,
        "medium" => 2.0,
        "large" => 4.0,
        "xlarge" => 8.0,
        "metal" => METAL_FACTORS
            .iter()
            .find(|(name, _)| *name == family)
            .map(|(_, factor)| *factor)
            .ok_or_else(unknown)?,
        other => {
            let multiplier: u32 = other
                .strip_suffix("xlarge")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .ok_or_else(unknown)?;
            8.0 * f64::from(multiplier)
        }
    };

    Ok((family.to_string(), factor))
}
