//! Canonicalization of technician / field-code labels.
//!
//! Portal exports carry labels like `"DT3 - NV.Nguyen Van A (ca 2)"` where
//! the prefix is an org code and the parenthetical is shift noise. Reports
//! from different days disagree on both, so everything that groups by
//! technician goes through [`normalize_technician`] first.

/// Keep only the segment after the last `-`, strip `(...)` substrings, trim.
///
/// Pure and total: any input produces some output, an unrecognized shape is
/// returned trimmed but otherwise unchanged.
pub fn normalize_technician(raw: &str) -> String {
    let tail = match raw.rfind('-') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };
    strip_parentheticals(tail).trim().to_string()
}

/// Absent labels pass through untouched.
pub fn normalize_opt(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_technician)
}

// Removes matched (...) pairs innermost-first; unbalanced parens are left
// alone.
fn strip_parentheticals(s: &str) -> String {
    let mut out = s.to_string();
    loop {
        let Some(close) = out.find(')') else { break };
        let Some(open) = out[..close].rfind('(') else { break };
        out.replace_range(open..=close, "");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_trailing_segment_and_strips_parens() {
        assert_eq!(normalize_technician("A - B (x)"), "B");
    }

    #[test]
    fn no_dash_passes_through() {
        assert_eq!(normalize_technician("NoDash"), "NoDash");
    }

    #[test]
    fn last_dash_wins() {
        assert_eq!(normalize_technician("DT3 - NV - Nguyen Van A"), "Nguyen Van A");
    }

    #[test]
    fn nested_and_unbalanced_parens() {
        assert_eq!(normalize_technician("B ((x) y)"), "B");
        assert_eq!(normalize_technician("B )x"), "B )x");
    }

    #[test]
    fn absent_value_is_untouched() {
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize_opt(Some("A - B")), Some("B".to_string()));
    }
}
