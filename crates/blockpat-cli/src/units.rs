//! Human-readable byte counts, decimal (kB) or binary (kiB) base.

const DECIMAL_UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
const BINARY_UNITS: [&str; 6] = ["B", "kiB", "MiB", "GiB", "TiB", "PiB"];

/// Format a byte count with one decimal place in the largest fitting unit.
pub fn pretty_bytes(bytes: u64, base1000: bool) -> String {
    let (base, units) = if base1000 {
        (1000.0_f64, &DECIMAL_UNITS)
    } else {
        (1024.0_f64, &BINARY_UNITS)
    };

    if (bytes as f64) < base {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= base && unit < units.len() - 1 {
        value /= base;
        unit += 1;
    }
    format!("{value:.1} {}", units[unit])
}
