use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse `text` as RFC 3339, RFC 2822, or one of `formats` (chrono syntax).
///
/// Formats without a time component are taken as midnight UTC; formats
/// without an offset are taken as UTC.
pub fn parse(text: &str, formats: &[&str]) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    formats.iter().find_map(|format| {
        DateTime::parse_from_str(text, format)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, format)
                    .ok()
                    .map(|naive| naive.and_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            })
    })
}

/// Like [`parse`], but an unparseable date becomes the current time.
pub fn parse_or_now(text: &str, formats: &[&str]) -> DateTime<Utc> {
    parse(text, formats).unwrap_or_else(|| {
        tracing::debug!("Unparseable date {:?}, using fetch time", text);
        Utc::now()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_and_rfc2822() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse("2024-01-01T00:00:00Z", &[]), Some(expected));
        assert_eq!(parse("Mon, 01 Jan 2024 00:00:00 GMT", &[]), Some(expected));
    }

    #[test]
    fn test_parse_date_only_formats() {
        let expected = Utc.with_ymd_and_hms(2022, 9, 15, 0, 0, 0).unwrap();
        assert_eq!(parse("September 15, 2022", &["%B %d, %Y"]), Some(expected));
        assert_eq!(
            parse("07 Jan 2023", &["%B %d, %Y", "%d %b %Y"]),
            Some(Utc.with_ymd_and_hms(2023, 1, 7, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_naive_datetime() {
        assert_eq!(
            parse("2023-03-04T10:20:30", &["%Y-%m-%dT%H:%M:%S"]),
            Some(Utc.with_ymd_and_hms(2023, 3, 4, 10, 20, 30).unwrap())
        );
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse("yesterday-ish", &["%Y-%m-%d"]), None);
        assert_eq!(parse("   ", &["%Y-%m-%d"]), None);
    }

    #[test]
    fn test_parse_or_now_falls_back() {
        let before = Utc::now();
        let parsed = parse_or_now("not a date", &[]);
        assert!(parsed >= before);
    }
}
