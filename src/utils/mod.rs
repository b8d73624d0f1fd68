use std::time::Instant;
use tracing::debug;

/// Logs how long a pipeline phase took when dropped.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        debug!("⏱  {}…", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱  {} took {:.2?}", self.label, self.start.elapsed());
    }
}

/// Insert thousands separators into the integer part of a digit string.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a count with thousands separators. -42000 → "-42,000"
pub fn fmt_number(n: i64) -> String {
    let grouped = group_thousands(&n.unsigned_abs().to_string());
    if n < 0 { format!("-{}", grouped) } else { grouped }
}

/// Format a real with thousands separators and fixed decimals.
pub fn fmt_decimal(x: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, x.abs());
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), ""));
    let sign = if x < 0.0 && s.chars().any(|c| c != '0' && c != '.') { "-" } else { "" };
    if frac.is_empty() {
        format!("{}{}", sign, group_thousands(int))
    } else {
        format!("{}{}.{}", sign, group_thousands(int), frac)
    }
}

/// Signed change with an optional percentage: "+1,200 (+12.5%)"
pub fn fmt_change(change: f64, pct: Option<f64>) -> String {
    let sign = if change > 0.0 { "+" } else { "" };
    let abs = if change.fract() == 0.0 {
        fmt_number(change as i64)
    } else {
        fmt_decimal(change, 1)
    };
    match pct {
        Some(p) => format!("{}{} ({}{:.1}%)", sign, abs, if p > 0.0 { "+" } else { "" }, p),
        None => format!("{}{}", sign, abs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(1_234_567), "1,234,567");
        assert_eq!(fmt_number(0), "0");
        assert_eq!(fmt_number(-42_000), "-42,000");
        assert_eq!(fmt_number(999), "999");
        assert_eq!(fmt_number(i64::MIN), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn test_fmt_decimal() {
        assert_eq!(fmt_decimal(1234567.891, 1), "1,234,567.9");
        assert_eq!(fmt_decimal(12.0, 0), "12");
        assert_eq!(fmt_decimal(-1500.25, 2), "-1,500.25");
        assert_eq!(fmt_decimal(-0.001, 1), "0.0");
    }

    #[test]
    fn test_fmt_change() {
        assert_eq!(fmt_change(1200.0, Some(12.5)), "+1,200 (+12.5%)");
        assert_eq!(fmt_change(-80.0, Some(-44.444)), "-80 (-44.4%)");
        assert_eq!(fmt_change(2.5, None), "+2.5");
    }
}
