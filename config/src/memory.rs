//! Human-readable memory size parsing.

use crate::error::ConfigError;

/// Parses a size like `512`, `1g`, `1.5GiB` into a mebibyte count.
/// A bare number is already in mebibytes.
pub fn parse_memory_mib(input: &str) -> Result<u64, ConfigError> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err(ConfigError::InvalidArgument(
            "empty memory value".to_string(),
        ));
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number.parse().map_err(|_| {
        ConfigError::InvalidArgument(format!("invalid memory value: {input}"))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidArgument(format!(
            "invalid memory value: {input}"
        )));
    }

    let bytes_per_unit: f64 = match unit.trim() {
        "" => 1_048_576.0,
        "b" => 1.0,
        "k" | "kb" | "kib" => 1_024.0,
        "m" | "mb" | "mib" => 1_048_576.0,
        "g" | "gb" | "gib" => 1_073_741_824.0,
        "t" | "tb" | "tib" => 1_099_511_627_776.0,
        other => {
            return Err(ConfigError::InvalidArgument(format!(
                "unknown memory unit: {other}"
            )))
        }
    };

    let mebibytes = (value * bytes_per_unit / 1_048_576.0).floor();
    if mebibytes > u64::MAX as f64 {
        return Err(ConfigError::InvalidArgument(format!(
            "memory value overflow: {input}"
        )));
    }
    Ok(mebibytes as u64)
}

/// Converts a tmpfs `size=` value to bytes. The surface unit is the same
/// mebibyte count the memory parser yields, multiplied out with checked
/// arithmetic so an oversized value is reported rather than wrapped.
pub fn tmpfs_size_bytes(input: &str) -> Result<i64, ConfigError> {
    let mebibytes = parse_memory_mib(input)?;
    i64::try_from(mebibytes)
        .ok()
        .and_then(|m| m.checked_mul(1_048_576))
        .ok_or_else(|| ConfigError::InvalidArgument(format!("tmpfs size overflow: {input}")))
}
