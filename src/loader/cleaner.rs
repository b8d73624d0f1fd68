use chrono::{NaiveDate, NaiveDateTime};

// ── Cell parsers ──────────────────────────────────────────────────────────────

fn is_blank(s: &str) -> bool {
    s.is_empty() || s == "N/A" || s == "-" || s == "—"
}

/// Parse a count cell: thousands separators allowed, must be a
/// non-negative whole number. "1,234" → 1234 | "12.0" → 12
pub fn parse_count(s: &str) -> Option<i64> {
    let s = s.trim().replace(',', "");
    if is_blank(&s) {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return (n >= 0).then_some(n);
    }
    // Some exports write integer columns as floats
    let f: f64 = s.parse().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= i64::MAX as f64).then_some(f as i64)
}

/// Parse a non-negative real cell. "1,234.5" → 1234.5
pub fn parse_real(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', "").replace('%', "");
    if is_blank(&s) {
        return None;
    }
    let f: f64 = s.parse().ok()?;
    (f.is_finite() && f >= 0.0).then_some(f)
}

/// Optional cells: blank means absent, anything else must parse.
/// Outer `None` = malformed, `Some(None)` = blank.
pub fn parse_optional_real(s: &str) -> Option<Option<f64>> {
    let t = s.trim();
    if is_blank(t) {
        return Some(None);
    }
    parse_real(t).map(Some)
}

/// Parse dates: ISO first, then the formats spreadsheet exports produce.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d %b %Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%b %d, %Y") {
        return Some(d);
    }

    None
}

/// Header names are matched case-insensitively, ignoring surrounding space.
pub fn normalise_column(s: &str) -> String {
    s.trim().trim_start_matches('\u{feff}').to_uppercase().replace(' ', "_")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
