use serde::Serializer;
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime,
};

// Birth dates travel as bare calendar dates.
const DATE_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// `serialize_with` helper rendering `Option<Date>` as `"YYYY-MM-DD"` or `null`.
pub fn serialize_date_only<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => {
            let text = d.format(DATE_ONLY).map_err(serde::ser::Error::custom)?;
            s.serialize_some(&text)
        }
        None => s.serialize_none(),
    }
}

/// Parse a user supplied birth date. Accepts `YYYY-MM-DD` or a full RFC 3339
/// timestamp, whose calendar date (UTC) is kept.
pub fn parse_birth_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if let Ok(d) = Date::parse(raw, DATE_ONLY) {
        return Some(d);
    }
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .map(|ts| ts.to_offset(time::UtcOffset::UTC).date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_plain_dates() {
        assert_eq!(parse_birth_date("1999-04-30"), Some(date!(1999 - 04 - 30)));
        assert_eq!(parse_birth_date(" 2001-01-02 "), Some(date!(2001 - 01 - 02)));
    }

    #[test]
    fn parses_timestamps_to_utc_date() {
        assert_eq!(
            parse_birth_date("2000-02-29T23:30:00-02:00"),
            Some(date!(2000 - 03 - 01))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_birth_date("not-a-date"), None);
        assert_eq!(parse_birth_date("2001-13-01"), None);
        assert_eq!(parse_birth_date(""), None);
    }

    #[test]
    fn serializes_without_time_component() {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(serialize_with = "serialize_date_only")]
            d: Option<Date>,
        }
        let json = serde_json::to_string(&Wrapper { d: Some(date!(1990 - 07 - 05)) }).unwrap();
        assert_eq!(json, r#"{"d":"1990-07-05"}"#);
        let json = serde_json::to_string(&Wrapper { d: None }).unwrap();
        assert_eq!(json, r#"{"d":null}"#);
    }
}
