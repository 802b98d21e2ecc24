//! Cell text formatting.
//!
//! Grouping follows en-US conventions (`,` thousands, `.` decimal). Rounding to
//! a maximum number of fraction digits works on the shortest decimal that
//! round-trips the `f64`, so `1234567.8912345` rounds to `.891235` even though
//! its binary value sits just below the half.

/// Placeholder for absent numeric cells.
pub const DASH: &str = "-";

pub const MONEY_MAX_FRACTION: usize = 6;
pub const NUMBER_MAX_FRACTION: usize = 3;
pub const PRICE_FRACTION: usize = 6;

/// `$` plus grouped value with up to 6 fraction digits, or `-`.
pub fn fmt_money(v: Option<f64>) -> String {
    match finite(v) {
        Some(n) => format!("${}", group_decimal(n, MONEY_MAX_FRACTION)),
        None => DASH.to_string(),
    }
}

/// Grouped value with up to 3 fraction digits, or `-`.
pub fn fmt_number(v: Option<f64>) -> String {
    match finite(v) {
        Some(n) => group_decimal(n, NUMBER_MAX_FRACTION),
        None => DASH.to_string(),
    }
}

/// Ownership share. Values at or below 1 are fractions, larger values are
/// already percentages. Absent renders empty.
pub fn fmt_percent(v: Option<f64>) -> String {
    match finite(v) {
        Some(n) => {
            let pct = if n <= 1.0 { n * 100.0 } else { n };
            format!("{}%", round_half_up(pct, 2))
        }
        None => String::new(),
    }
}

/// Price change that is already a percentage.
pub fn fmt_change(v: Option<f64>) -> String {
    match finite(v) {
        Some(n) => format!("{}%", round_half_up(n, 2)),
        None => String::new(),
    }
}

/// Fixed 6 fraction digits, no grouping.
pub fn fmt_price(v: Option<f64>) -> String {
    match finite(v) {
        Some(n) => format!("${}", fixed_decimal(n, PRICE_FRACTION)),
        None => DASH.to_string(),
    }
}

pub fn fmt_text(v: Option<&str>) -> String {
    v.unwrap_or("").to_string()
}

pub fn fmt_name(v: Option<&str>) -> String {
    v.unwrap_or(DASH).to_string()
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|n| n.is_finite())
}

/// Round to `places` decimals with halves going toward +inf, then print in
/// shortest form.
fn round_half_up(n: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let rounded = (n * scale + 0.5).floor() / scale;
    // collapse -0 so it prints as "0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Exactly `fraction` digits, no grouping. The exact binary value is rounded
/// and a tie goes to the larger magnitude, where `{:.N}` would pick the even
/// digit.
pub fn fixed_decimal(n: f64, fraction: usize) -> String {
    // -0 prints as "0.000000"
    let n = if n == 0.0 { 0.0 } else { n };
    // A tie needs n * 2^(fraction+1) to be whole; then one extra digit prints
    // the value exactly and that digit is the 5.
    let halves = n * 2f64.powi(fraction as i32 + 1);
    let wider = format!("{:.*}", fraction + 1, n.abs());
    if halves.fract() != 0.0 || !wider.ends_with('5') {
        return format!("{:.*}", fraction, n);
    }

    let (int_part, frac_part) = match wider.split_once('.') {
        Some(parts) => parts,
        None => return format!("{:.*}", fraction, n),
    };
    let mut digits: Vec<u8> = int_part.bytes().collect();
    let mut int_len = digits.len();
    digits.extend_from_slice(&frac_part.as_bytes()[..fraction]);
    if increment_digits(&mut digits) {
        int_len += 1;
    }

    let mut out = String::with_capacity(digits.len() + 2);
    if n < 0.0 {
        out.push('-');
    }
    out.extend(digits[..int_len].iter().map(|d| *d as char));
    if fraction > 0 {
        out.push('.');
        out.extend(digits[int_len..].iter().map(|d| *d as char));
    }
    out
}

/// Add one unit in the last place; returns true when a leading `1` was added.
fn increment_digits(digits: &mut Vec<u8>) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return false;
        }
    }
    digits.insert(0, b'1');
    true
}

/// Format `n` with thousands separators and at most `max_fraction` digits,
/// trailing zeros dropped, halves rounded away from zero.
pub fn group_decimal(n: f64, max_fraction: usize) -> String {
    let (int_digits, frac_digits) = round_decimal_digits(n.abs(), max_fraction);
    let zero = int_digits.iter().all(|d| *d == b'0') && frac_digits.is_empty();

    let mut out = String::new();
    if n < 0.0 && !zero {
        out.push('-');
    }
    let len = int_digits.len();
    for (i, d) in int_digits.iter().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*d as char);
    }
    if !frac_digits.is_empty() {
        out.push('.');
        out.extend(frac_digits.iter().map(|d| *d as char));
    }
    out
}

/// Returns the integer digits and the trimmed fraction digits of `n >= 0`.
fn round_decimal_digits(n: f64, max_fraction: usize) -> (Vec<u8>, Vec<u8>) {
    // Display for f64 yields the shortest round-trip decimal, never exponent form.
    let repr = n.to_string();
    let (int_part, frac_part) = match repr.split_once('.') {
        Some((i, f)) => (i, f),
        None => (repr.as_str(), ""),
    };

    let mut digits: Vec<u8> = int_part.bytes().collect();
    let mut int_len = digits.len();
    let frac = frac_part.as_bytes();
    let kept = frac.len().min(max_fraction);
    digits.extend_from_slice(&frac[..kept]);

    let round_up = frac.get(max_fraction).map(|d| *d >= b'5').unwrap_or(false);
    if round_up && increment_digits(&mut digits) {
        int_len += 1;
    }

    let mut fraction = digits.split_off(int_len);
    while fraction.last() == Some(&b'0') {
        fraction.pop();
    }
    (digits, fraction)
}
