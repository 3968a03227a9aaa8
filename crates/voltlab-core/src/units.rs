//! Engineering-unit formatting for element info lines.

fn scale(value: f64) -> (f64, &'static str) {
    let abs = value.abs();
    if abs >= 1e9 {
        (value / 1e9, "G")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "k")
    } else if abs >= 1.0 || abs == 0.0 {
        (value, "")
    } else if abs >= 1e-3 {
        (value / 1e-3, "m")
    } else if abs >= 1e-6 {
        (value / 1e-6, "µ")
    } else if abs >= 1e-9 {
        (value / 1e-9, "n")
    } else {
        (value / 1e-12, "p")
    }
}

fn trim(scaled: f64) -> String {
    let text = format!("{scaled:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

/// Format a value with an appropriate SI prefix ("4.7k").
pub fn format_value(value: f64) -> String {
    let (scaled, prefix) = scale(value);
    format!("{}{prefix}", trim(scaled))
}

/// Format a value with an SI-prefixed unit ("4.7 kΩ").
pub fn format_unit(value: f64, unit: &str) -> String {
    let (scaled, prefix) = scale(value);
    format!("{} {prefix}{unit}", trim(scaled))
}
