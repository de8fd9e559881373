use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

// The list endpoint renders timestamps for display, the live channel sends ISO-8601.
const DATETIME_FORMATS: [&str; 4] = [
    "%H:%M %d.%m.%Y",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

pub fn empty_as_none<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

pub fn flexible_datetime<'de, D>(d: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(d)? {
        Some(s) => s,
        None => return Ok(None),
    };
    Ok(parse_datetime(raw.trim()))
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    let trimmed = raw.trim_end_matches('Z');
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

/// Pagination numbers come back either as JSON numbers or as the raw query string value.
pub fn lenient_u32<'de, D>(d: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }

    match Raw::deserialize(d)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|e| serde::de::Error::custom(format!("invalid page number '{}': {}", s, e))),
    }
}

pub fn one() -> u32 {
    1
}
