//! The [LogRecord] type and its pipe-delimited line format.
//!
//! A record serializes to exactly one line:
//!
//! ```text
//! timestamp|level|request_id|source_ip|method|endpoint|status|response_ms|message
//! ```

use std::{
    borrow::Cow,
    fmt,
    io::{self, Write},
    net::Ipv4Addr,
    str::FromStr,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

/// Field separator of the line format.
pub const DELIMITER: char = '|';

/// Number of fields in a serialized line.
pub const FIELD_COUNT: usize = 9;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 9 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid timestamp")]
    Timestamp,
    #[error("unknown log level")]
    UnknownLevel,
    #[error("unknown http method")]
    UnknownMethod,
    #[error("invalid request id")]
    RequestId,
    #[error("invalid source ip")]
    SourceIp,
    #[error("invalid integer in field `{0}`")]
    Integer(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Info,
    Debug,
    Warn,
    Error,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Info, Level::Debug, Level::Warn, Level::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl FromStr for Level {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or(ParseError::UnknownLevel)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or(ParseError::UnknownMethod)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request path, optionally suffixed with a numeric resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: Cow<'static, str>,
    pub resource_id: Option<u16>,
}

impl Endpoint {
    fn write_to<W: Write>(&self, w: &mut W, itoa_buf: &mut itoa::Buffer) -> io::Result<()> {
        w.write_all(self.path.as_bytes())?;
        if let Some(id) = self.resource_id {
            w.write_all(b"/")?;
            w.write_all(itoa_buf.format(id).as_bytes())?;
        }
        Ok(())
    }
}

impl FromStr for Endpoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let endpoint = match s.rsplit_once('/') {
            Some((path, id)) if !path.is_empty() => match id.parse::<u16>() {
                Ok(id) => Endpoint {
                    path: Cow::Owned(path.to_owned()),
                    resource_id: Some(id),
                },
                Err(_) => Endpoint {
                    path: Cow::Owned(s.to_owned()),
                    resource_id: None,
                },
            },
            _ => Endpoint {
                path: Cow::Owned(s.to_owned()),
                resource_id: None,
            },
        };
        Ok(endpoint)
    }
}

/// One synthesized request log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: OffsetDateTime,
    pub level: Level,
    pub request_id: Uuid,
    pub source_ip: Ipv4Addr,
    pub http_method: Method,
    pub endpoint: Endpoint,
    pub status_code: u16,
    pub response_time_ms: u32,
    pub message: Cow<'static, str>,
}

impl LogRecord {
    /// Writes the record as one line, including the trailing `\n`.
    pub fn write_line<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut itoa_buf = itoa::Buffer::new();
        let mut uuid_buf = Uuid::encode_buffer();
        let sep = [DELIMITER as u8];

        self.timestamp
            .format_into(w, &Rfc3339)
            .map_err(io::Error::other)?;
        w.write_all(&sep)?;
        w.write_all(self.level.as_str().as_bytes())?;
        w.write_all(&sep)?;
        w.write_all(
            self.request_id
                .hyphenated()
                .encode_lower(&mut uuid_buf)
                .as_bytes(),
        )?;
        w.write_all(&sep)?;
        write!(w, "{}", self.source_ip)?;
        w.write_all(&sep)?;
        w.write_all(self.http_method.as_str().as_bytes())?;
        w.write_all(&sep)?;
        self.endpoint.write_to(w, &mut itoa_buf)?;
        w.write_all(&sep)?;
        w.write_all(itoa_buf.format(self.status_code).as_bytes())?;
        w.write_all(&sep)?;
        w.write_all(itoa_buf.format(self.response_time_ms).as_bytes())?;
        w.write_all(&sep)?;
        w.write_all(self.message.as_bytes())?;
        w.write_all(b"\n")
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::with_capacity(200);
        self.write_line(&mut buf).map_err(|_| fmt::Error)?;
        buf.pop();
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Splits a line (without its terminator) into its fields.
pub fn split_fields(line: &str) -> Result<[&str; FIELD_COUNT], ParseError> {
    let mut fields = [""; FIELD_COUNT];
    let mut count = 0;
    for field in line.split(DELIMITER) {
        if count < FIELD_COUNT {
            fields[count] = field;
        }
        count += 1;
    }
    if count != FIELD_COUNT {
        return Err(ParseError::FieldCount(count));
    }
    Ok(fields)
}

impl FromStr for LogRecord {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let [timestamp, level, request_id, source_ip, method, endpoint, status, response, message] =
            split_fields(line.trim_end_matches(['\r', '\n']))?;

        Ok(LogRecord {
            timestamp: OffsetDateTime::parse(timestamp, &Rfc3339)
                .map_err(|_| ParseError::Timestamp)?,
            level: level.parse()?,
            request_id: Uuid::parse_str(request_id).map_err(|_| ParseError::RequestId)?,
            source_ip: source_ip.parse().map_err(|_| ParseError::SourceIp)?,
            http_method: method.parse()?,
            endpoint: endpoint.parse()?,
            status_code: status
                .parse()
                .map_err(|_| ParseError::Integer("status_code"))?,
            response_time_ms: response
                .parse()
                .map_err(|_| ParseError::Integer("response_time_ms"))?,
            message: Cow::Owned(message.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> LogRecord {
        LogRecord {
            timestamp: datetime!(2024-03-01 12:30:45.25 UTC),
            level: Level::Warn,
            request_id: Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef),
            source_ip: Ipv4Addr::new(10, 0, 12, 255),
            http_method: Method::Post,
            endpoint: Endpoint {
                path: Cow::Borrowed("/api/orders"),
                resource_id: Some(42),
            },
            status_code: 400,
            response_time_ms: 87,
            message: Cow::Borrowed("Invalid input parameters"),
        }
    }

    #[test]
    fn test_write_line_format() {
        let mut buf = Vec::new();
        sample().write_line(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2024-03-01T12:30:45.25Z|WARN|01234567-89ab-cdef-0123-456789abcdef|10.0.12.255|\
             POST|/api/orders/42|400|87|Invalid input parameters\n"
        );
    }

    #[test]
    fn test_display_has_no_terminator() {
        let line = sample().to_string();
        assert!(!line.ends_with('\n'));
        assert_eq!(line.split(DELIMITER).count(), FIELD_COUNT);
    }

    #[test]
    fn test_parse_written_line() {
        let record = sample();
        let mut buf = Vec::new();
        record.write_line(&mut buf).unwrap();
        let parsed: LogRecord = std::str::from_utf8(&buf).unwrap().parse().unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_endpoint_without_id() {
        let endpoint: Endpoint = "/api/products/search".parse().unwrap();
        assert_eq!(endpoint.path, "/api/products/search");
        assert_eq!(endpoint.resource_id, None);

        let endpoint: Endpoint = "/api/users/profile/7".parse().unwrap();
        assert_eq!(endpoint.path, "/api/users/profile");
        assert_eq!(endpoint.resource_id, Some(7));
    }

    #[test]
    fn test_parse_rejects_field_count() {
        assert_eq!(
            "a|b|c".parse::<LogRecord>().unwrap_err(),
            ParseError::FieldCount(3)
        );
        assert_eq!(
            split_fields("1|2|3|4|5|6|7|8|9|10").unwrap_err(),
            ParseError::FieldCount(10)
        );
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        let line = sample().to_string();

        let bad_level = line.replacen("WARN", "LOUD", 1);
        assert_eq!(
            bad_level.parse::<LogRecord>().unwrap_err(),
            ParseError::UnknownLevel
        );

        let bad_status = line.replacen("|400|", "|4x0|", 1);
        assert_eq!(
            bad_status.parse::<LogRecord>().unwrap_err(),
            ParseError::Integer("status_code")
        );

        let bad_ip = line.replacen("10.0.12.255", "10.0.12", 1);
        assert_eq!(
            bad_ip.parse::<LogRecord>().unwrap_err(),
            ParseError::SourceIp
        );
    }

    #[test]
    fn test_level_and_method_names() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
        }
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert!("get".parse::<Method>().is_err());
    }
}
