use chrono::{DateTime, Utc};

// Format a date for HTTP headers such as Expires (IMF-fixdate)
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

// Parse an HTTP date header; anything that is not RFC 2822 compatible is ignored
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Wraps a bare entity tag in double quotes, as sent in the `ETag` header.
pub fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}

/// Strips the weak prefix and surrounding quotes from an entity tag.
pub fn bare_etag(tag: &str) -> &str {
    let tag = tag.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn http_date_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let formatted = format_http_date(&dt);
        assert_eq!(formatted, "Sat, 09 Mar 2024 14:05:00 GMT");
        assert_eq!(parse_http_date(&formatted), Some(dt));
    }

    #[test]
    fn garbage_dates_are_ignored() {
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn etag_normalisation() {
        assert_eq!(quote_etag("abc"), "\"abc\"");
        assert_eq!(bare_etag("\"abc\""), "abc");
        assert_eq!(bare_etag("W/\"abc\""), "abc");
        assert_eq!(bare_etag(" abc "), "abc");
    }
}
