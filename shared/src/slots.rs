use chrono::{DateTime, NaiveDateTime, Utc};

/// Result of parsing the raw timestamps a store submits for a service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedSlotTimes {
    pub times: Vec<DateTime<Utc>>,
    pub rejected: Vec<String>,
}

/// Accepts RFC 3339 or offset-less ISO-8601, the latter read as UTC.
pub fn parse_slot_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Splits input into parseable instants and rejected entries.
///
/// Duplicates inside one request collapse to a single instant.
pub fn parse_slot_times<S: AsRef<str>>(raw: &[S]) -> ParsedSlotTimes {
    let mut parsed = ParsedSlotTimes::default();
    for entry in raw {
        match parse_slot_time(entry.as_ref()) {
            Some(at) if !parsed.times.contains(&at) => parsed.times.push(at),
            Some(_) => {}
            None => parsed.rejected.push(entry.as_ref().to_string()),
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_offset_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 8, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_slot_time("2024-08-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_slot_time("2024-08-01T07:30:00-03:00"), Some(expected));
        assert_eq!(parse_slot_time("2024-08-01T10:30:00"), Some(expected));
        assert_eq!(parse_slot_time("2024-08-01 10:30"), Some(expected));
    }

    #[test]
    fn malformed_entries_are_reported() {
        let parsed = parse_slot_times(&["2024-08-01T10:30:00", "tomorrow", "2024-13-01T10:00:00"]);
        assert_eq!(parsed.times.len(), 1);
        assert_eq!(parsed.rejected, vec!["tomorrow", "2024-13-01T10:00:00"]);
    }

    #[test]
    fn duplicates_collapse() {
        let parsed = parse_slot_times(&["2024-08-01T10:30:00Z", "2024-08-01T10:30:00"]);
        assert_eq!(parsed.times.len(), 1);
        assert!(parsed.rejected.is_empty());
    }
}
