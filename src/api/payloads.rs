//! Request payloads for the public API operations.

use serde::Serialize;

use crate::metrics::MetricEntry;

#[derive(Debug, Serialize)]
pub struct StatusPayload<'a> {
    pub apikey: &'a str,
    pub id: u64,
    pub status: u16,
    pub time: u64,
}

#[derive(Debug, Serialize)]
pub struct MetricPayload<'a> {
    pub apikey: &'a str,
    pub site: u64,
    #[serde(flatten)]
    pub entry: &'a MetricEntry,
}

/// Several metrics in one call; `list` is the JSON-encoded entry array.
#[derive(Debug, Serialize)]
pub struct MetricListPayload<'a> {
    pub apikey: &'a str,
    pub site: u64,
    pub list: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialsQuery<'a> {
    pub apikey: &'a str,
}

#[derive(Debug, Serialize)]
pub struct IncidentsQuery<'a> {
    pub apikey: &'a str,
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub struct IncidentPayload<'a> {
    pub apikey: &'a str,
    pub siteid: u64,
    pub incident_title: &'a str,
    pub data_description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u32>,
}

/// A page number for paginated listings; always at least 1.
///
/// Text is read like a lenient integer cast: leading whitespace and sign,
/// then leading digits. Anything that does not come out positive is page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(u32);

impl Page {
    pub fn get(self) -> u32 {
        self.0
    }

    fn coerce(value: i64) -> Self {
        match u32::try_from(value) {
            Ok(page) if page > 0 => Self(page),
            _ => Self::default(),
        }
    }

    fn parse_lenient(text: &str) -> Self {
        let text = text.trim_start();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());

        match digits[..end].parse::<i64>() {
            Ok(value) if !negative => Self::coerce(value),
            _ => Self::default(),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self(1)
    }
}

impl From<u32> for Page {
    fn from(page: u32) -> Self {
        Self::coerce(i64::from(page))
    }
}

impl From<i32> for Page {
    fn from(page: i32) -> Self {
        Self::coerce(i64::from(page))
    }
}

impl From<i64> for Page {
    fn from(page: i64) -> Self {
        Self::coerce(page)
    }
}

impl From<&str> for Page {
    fn from(page: &str) -> Self {
        Self::parse_lenient(page)
    }
}

impl From<String> for Page {
    fn from(page: String) -> Self {
        Self::parse_lenient(&page)
    }
}
