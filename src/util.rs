// Parsing and formatting helpers.
//
// All of the loosely-typed cell handling lives here so the normalizer and the
// aggregates can work on typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a volume cell written with a decimal comma.
///
/// - Trims whitespace and rejects empty or alphabetic text.
/// - When a comma is present, the last comma is the decimal separator and any
///   dots before it are thousands separators (`"1.234,56"` -> `1234.56`).
/// - Several commas and no dot means the commas are thousands separators
///   (`"1,234,567"` -> `1234567`).
/// - Text with no comma parses as a plain dotted decimal.
pub fn parse_volume(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let commas = s.matches(',').count();
    let normalized = match s.rfind(',') {
        None => s.to_string(),
        Some(_) if commas > 1 && !s.contains('.') => {
            if !is_comma_grouped(s) {
                return None;
            }
            s.replace(',', "")
        }
        Some(idx) => {
            let (int_part, frac_part) = s.split_at(idx);
            if int_part.contains(',') {
                return None;
            }
            format!("{}.{}", int_part.replace('.', ""), &frac_part[1..])
        }
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

// `1,234,567`: leading group of 1-3 digits, every later group exactly 3.
fn is_comma_grouped(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut groups = digits.split(',');
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    first_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Parse an integer code cell. Sheet exports sometimes render codes as
/// floats (`"1.0"`), which are accepted when they have no fractional part.
pub fn parse_code(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

/// Month-over-month growth in percent; zero when there is no previous volume.
pub fn growth_pct(latest: f64, previous: f64) -> f64 {
    if previous.abs() < f64::EPSILON {
        return 0.0;
    }
    let g = (latest - previous) / previous * 100.0;
    if g.is_finite() {
        g
    } else {
        0.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn format_pct(n: f64) -> String {
    let sign = if n > 0.0 { "+" } else { "" };
    format!("{}{}%", sign, format_number(n, 2))
}

/// `tabled` display hook for volume columns.
pub fn fmt_volume(v: &f64) -> String {
    format_number(*v, 2)
}
