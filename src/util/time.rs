use chrono::{SecondsFormat, Utc};

/// Fixed-width RFC 3339 timestamp (microsecond precision, `Z` suffix).
/// Fixed width keeps lexicographic order equal to chronological order,
/// which the newest-first listings rely on.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_fixed_width_and_ordered() {
        let a = now_rfc3339();
        let b = now_rfc3339();
        assert_eq!(a.len(), b.len());
        assert!(a <= b);
    }
}
