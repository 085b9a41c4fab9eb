//! Specifies how dates and timestamps are written in JSON bodies.
//!
//! Calendar dates use "2025-01-31" and timestamps use RFC 3339, e.g.
//! "2025-01-31T09:30:00Z", matching what the backend sends.

pub mod date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    /// Date format, e.g. "2025-01-31".
    pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date
            .format(DATE_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

pub mod option_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::date::DATE_FORMAT;

    pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => super::date::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;

        s.map(|s| Date::parse(&s, DATE_FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}

pub mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn serialize<S>(timestamp: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = timestamp
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
    }
}

pub mod option_timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn serialize<S>(timestamp: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match timestamp {
            Some(timestamp) => super::timestamp::serialize(timestamp, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;

        s.map(|s| OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::{
        Date, OffsetDateTime,
        macros::{date, datetime},
    };

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dated {
        #[serde(with = "super::date")]
        start: Date,
        #[serde(default, with = "super::option_date")]
        end: Option<Date>,
        #[serde(with = "super::timestamp")]
        created_at: OffsetDateTime,
    }

    #[test]
    fn serialises_dates_as_iso_strings() {
        let dated = Dated {
            start: date!(2025 - 01 - 05),
            end: None,
            created_at: datetime!(2025-01-05 00:00:00 UTC),
        };

        let json = serde_json::to_string(&dated).unwrap();

        assert_eq!(
            json,
            r#"{"start":"2025-01-05","end":null,"created_at":"2025-01-05T00:00:00Z"}"#
        );
    }

    #[test]
    fn deserialises_missing_optional_date() {
        let json = r#"{"start":"2025-01-05","created_at":"2025-01-05T10:15:00Z"}"#;

        let dated: Dated = serde_json::from_str(json).unwrap();

        assert_eq!(dated.end, None);
        assert_eq!(dated.created_at, datetime!(2025-01-05 10:15:00 UTC));
    }

    #[test]
    fn rejects_malformed_date() {
        let json = r#"{"start":"05/01/2025","created_at":"2025-01-05T10:15:00Z"}"#;

        assert!(serde_json::from_str::<Dated>(json).is_err());
    }
}
