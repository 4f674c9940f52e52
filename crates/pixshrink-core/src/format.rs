//! Human readable byte sizes

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
const STEP: f64 = 1024.0;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats a byte count with binary (1024) steps and up to two decimals,
/// dropping trailing zeros: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
///
/// Negative counts (a batch that grew) keep their sign.
pub fn format_file_size(bytes: i64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let sign = if bytes < 0 { "-" } else { "" };
    let magnitude = bytes.unsigned_abs() as f64;
    let exponent = (magnitude.ln() / STEP.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = round2(magnitude / STEP.powi(exponent as i32));

    format!("{}{} {}", sign, value, UNITS[exponent])
}
