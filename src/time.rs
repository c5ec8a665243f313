use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

pub type Timestamp = DateTime<Utc>;

/// Truncate a timestamp down to the start of its UTC minute.
///
/// This is the aggregation granularity of every counter: clicks that land anywhere inside
/// `[12:34:00, 12:35:00)` are all attributed to the `12:34:00` bucket.
pub fn minute_bucket<Tz: TimeZone>(at: DateTime<Tz>) -> Timestamp {
    let seconds = at.timestamp().div_euclid(60) * 60;

    // chrono's range starts on a midnight, so flooring an in-range timestamp stays in range
    DateTime::from_timestamp(seconds, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The bucket that a click arriving right now belongs to.
pub fn current_bucket() -> Timestamp {
    minute_bucket(Utc::now())
}

/// Parse an RFC 3339 timestamp and normalize it to UTC.
pub fn parse_rfc3339(input: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(input).map(|dt| dt.with_timezone(&Utc))
}

/// Serialize a timestamp as RFC 3339 with whole seconds and a `Z` suffix, e.g. `2024-01-01T00:00:00Z`.
pub fn serialize_rfc3339<S: serde::Serializer>(
    timestamp: &Timestamp, serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{FixedOffset, Timelike};

    fn utc(input: &str) -> Timestamp {
        parse_rfc3339(input).unwrap()
    }

    #[test]
    fn truncates_to_the_start_of_the_minute() {
        let bucket = minute_bucket(utc("2024-01-01T00:00:30.123456Z"));
        assert_eq!(bucket, utc("2024-01-01T00:00:00Z"));
        assert_eq!(bucket.second(), 0);
        assert_eq!(bucket.nanosecond(), 0);
    }

    #[test]
    fn clicks_inside_the_same_minute_share_a_bucket() {
        let first = minute_bucket(utc("2024-01-01T00:00:30Z"));
        let second = minute_bucket(utc("2024-01-01T00:00:45Z"));
        assert_eq!(first, second);

        let next = minute_bucket(utc("2024-01-01T00:01:00Z"));
        assert_ne!(first, next, "the next minute starts a new bucket");
    }

    #[test]
    fn bucketing_is_idempotent() {
        let samples = [
            "1970-01-01T00:00:00Z",
            "2024-02-29T23:59:59.999999999Z",
            "2024-06-15T12:34:56+05:30",
            "2031-12-31T00:00:01-08:00",
            "1600-01-01T00:00:30Z",
            "2300-01-01T00:00:30Z",
            "1969-12-31T23:59:30.5Z",
        ];

        for sample in samples {
            let once = minute_bucket(utc(sample));
            assert_eq!(minute_bucket(once), once, "bucket of `{sample}` is not stable");
        }
    }

    #[test]
    fn buckets_have_no_seconds_across_the_whole_calendar() {
        let cases = [
            ("1600-01-01T00:00:30Z", "1600-01-01T00:00:00Z"),
            ("1677-09-21T00:12:43.5Z", "1677-09-21T00:12:00Z"),
            ("1969-12-31T23:59:30.5Z", "1969-12-31T23:59:00Z"),
            ("2262-04-11T23:47:16.9Z", "2262-04-11T23:47:00Z"),
            ("2300-01-01T00:00:30Z", "2300-01-01T00:00:00Z"),
            ("9999-12-31T23:59:59.999999999Z", "9999-12-31T23:59:00Z"),
        ];

        for (sample, expected) in cases {
            let bucket = minute_bucket(utc(sample));
            assert_eq!(bucket, utc(expected), "bucket of `{sample}`");
            assert_eq!(bucket.second(), 0);
            assert_eq!(bucket.nanosecond(), 0);
        }

        let earliest = minute_bucket(DateTime::<Utc>::MIN_UTC);
        assert_eq!(earliest.second(), 0);
        assert_eq!(earliest, DateTime::<Utc>::MIN_UTC);

        let latest = minute_bucket(DateTime::<Utc>::MAX_UTC);
        assert_eq!(latest.second(), 0);
        assert_eq!(latest.nanosecond(), 0);
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let local = offset.with_ymd_and_hms(2024, 6, 15, 18, 4, 56).unwrap();

        let bucket = minute_bucket(local);
        assert_eq!(bucket, utc("2024-06-15T12:34:00Z"));
    }

    #[test]
    fn current_bucket_has_no_seconds() {
        let bucket = current_bucket();
        assert_eq!(bucket.second(), 0);
        assert_eq!(bucket.nanosecond(), 0);
        assert!(bucket <= Utc::now());
    }

    #[test]
    fn rejects_non_rfc3339_input() {
        assert!(parse_rfc3339("").is_err());
        assert!(parse_rfc3339("2024-01-01").is_err());
        assert!(parse_rfc3339("2024-01-01 00:00:00").is_err());
    }

    #[test]
    fn serializes_with_z_suffix() {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(serialize_with = "serialize_rfc3339")]
            ts: Timestamp,
        }

        let json = serde_json::to_string(&Wrapper {
            ts: utc("2024-01-01T00:00:00+00:00"),
        })
        .unwrap();
        assert_eq!(json, r#"{"ts":"2024-01-01T00:00:00Z"}"#);
    }
}
