//! NMEA 0183 sentence parsing
//!
//! Parses the position-carrying sentences (`GGA`, `RMC`, `GLL`) from any
//! talker into a [`LocationFix`]. Sentence format:
//!
//! ```text
//! $GPRMC,hhmmss.ss,A,ddmm.mmmm,N,dddmm.mmmm,E,speed,course,ddmmyy,,,*HH
//! ```
//!
//! The `*HH` suffix is the XOR of every byte between `$` and `*`, in hex.

use serde::Serialize;
use std::fmt;

use crate::error::NmeaError;

/// Knots to metres per second
pub const KNOTS_TO_MPS: f32 = 0.514444;

/// Which sentence a fix came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentenceKind {
    Gga,
    Rmc,
    Gll,
}

impl SentenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentenceKind::Gga => "GGA",
            SentenceKind::Rmc => "RMC",
            SentenceKind::Gll => "GLL",
        }
    }
}

/// How the receiver obtained its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixQuality {
    Gps,
    Dgps,
    Pps,
    RtkFixed,
    RtkFloat,
    /// Dead reckoning
    Estimated,
    Manual,
    Simulation,
}

impl FixQuality {
    /// GGA quality indicator; 0 (no fix) maps to `None`
    fn from_gga(code: u8) -> Option<Self> {
        Some(match code {
            0 => return None,
            2 => FixQuality::Dgps,
            3 => FixQuality::Pps,
            4 => FixQuality::RtkFixed,
            5 => FixQuality::RtkFloat,
            6 => FixQuality::Estimated,
            7 => FixQuality::Manual,
            8 => FixQuality::Simulation,
            _ => FixQuality::Gps,
        })
    }

    /// NMEA 2.3 mode indicator on RMC/GLL; `N` (not valid) maps to `None`
    fn from_mode(mode: &str) -> Option<Self> {
        Some(match mode {
            "N" => return None,
            "D" => FixQuality::Dgps,
            "P" => FixQuality::Pps,
            "R" => FixQuality::RtkFixed,
            "F" => FixQuality::RtkFloat,
            "E" => FixQuality::Estimated,
            "M" => FixQuality::Manual,
            "S" => FixQuality::Simulation,
            _ => FixQuality::Gps,
        })
    }
}

/// UTC time of day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UtcTime {
    pub hour: u8,
    pub minute: u8,
    /// Seconds including any fractional part
    pub second: f32,
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:06.3}", self.hour, self.minute, self.second)
    }
}

/// UTC calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A position reported by the accessory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFix {
    /// Degrees, WGS84, north positive
    pub latitude: f64,
    /// Degrees, WGS84, east positive
    pub longitude: f64,
    /// Metres above mean sea level
    pub altitude: Option<f32>,
    /// Speed over ground in m/s
    pub speed_mps: Option<f32>,
    /// Course over ground in degrees from true north
    pub course_deg: Option<f32>,
    pub hdop: Option<f32>,
    pub satellites: Option<u8>,
    pub time: Option<UtcTime>,
    pub date: Option<Date>,
    pub quality: FixQuality,
    pub sentence: SentenceKind,
}

impl LocationFix {
    fn new(latitude: f64, longitude: f64, quality: FixQuality, sentence: SentenceKind) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            speed_mps: None,
            course_deg: None,
            hdop: None,
            satellites: None,
            time: None,
            date: None,
            quality,
            sentence,
        }
    }
}

/// XOR of all bytes, as used by the `*HH` suffix
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}

/// Frame a command body as `$<body>*<checksum>\r\n`
/// Whether `body` can be framed as a command: non-empty printable ASCII
/// without the `$` and `*` delimiters
pub fn is_command_body(body: &str) -> bool {
    !body.is_empty()
        && body
            .bytes()
            .all(|b| (b' '..=b'~').contains(&b) && b != b'$' && b != b'*')
}

pub fn frame_command(body: &str) -> String {
    format!("${}*{:02X}\r\n", body, checksum(body.as_bytes()))
}

/// Parse one sentence
///
/// `line` may carry leading garbage before the `$` and a trailing line
/// terminator. When `verify_checksum` is set and a `*HH` suffix is present it
/// must match.
pub fn parse_sentence(line: &[u8], verify_checksum: bool) -> Result<LocationFix, NmeaError> {
    let start = line
        .iter()
        .position(|&b| b == b'$')
        .ok_or(NmeaError::MissingStart)?;
    let sentence = std::str::from_utf8(&line[start + 1..])
        .map_err(|_| NmeaError::InvalidUtf8)?
        .trim_end();

    let body = match sentence.split_once('*') {
        Some((body, sum)) => {
            let expected = parse_checksum(sum)?;
            if verify_checksum {
                let computed = checksum(body.as_bytes());
                if computed != expected {
                    return Err(NmeaError::ChecksumMismatch { expected, computed });
                }
            }
            body
        }
        None => sentence,
    };

    let fields: Vec<&str> = body.split(',').collect();
    let address = fields[0];
    // Standard sentences are a two-letter talker id and a three-letter type;
    // proprietary ones start with 'P'
    if address.len() != 5 || !address.is_ascii() || address.starts_with('P') {
        return Err(NmeaError::Unsupported(address.to_string()));
    }

    match &address[2..] {
        "GGA" => parse_gga(&fields),
        "RMC" => parse_rmc(&fields),
        "GLL" => parse_gll(&fields),
        _ => Err(NmeaError::Unsupported(address.to_string())),
    }
}

fn parse_checksum(s: &str) -> Result<u8, NmeaError> {
    let s = s.trim();
    if s.len() != 2 {
        return Err(NmeaError::MalformedChecksum(s.to_string()));
    }
    u8::from_str_radix(s, 16).map_err(|_| NmeaError::MalformedChecksum(s.to_string()))
}

fn require(fields: &[&str], kind: SentenceKind, needed: usize) -> Result<(), NmeaError> {
    if fields.len() < needed {
        return Err(NmeaError::TooFewFields {
            kind: kind.as_str(),
            found: fields.len(),
            needed,
        });
    }
    Ok(())
}

/// `$xxGGA,time,lat,N,lon,E,quality,sats,hdop,alt,M,geoid,M,age,station`
fn parse_gga(fields: &[&str]) -> Result<LocationFix, NmeaError> {
    require(fields, SentenceKind::Gga, 10)?;

    let code = parse_number::<u8>(fields[6], "quality")?.unwrap_or(0);
    let quality = FixQuality::from_gga(code).ok_or(NmeaError::NoFix)?;
    let (latitude, longitude) = parse_position(&fields[2..6])?;

    let mut fix = LocationFix::new(latitude, longitude, quality, SentenceKind::Gga);
    fix.time = parse_time(fields[1])?;
    fix.satellites = parse_number(fields[7], "satellites")?;
    fix.hdop = parse_number(fields[8], "hdop")?;
    fix.altitude = parse_number(fields[9], "altitude")?;
    Ok(fix)
}

/// `$xxRMC,time,status,lat,N,lon,E,speed,course,date,magvar,E[,mode]`
fn parse_rmc(fields: &[&str]) -> Result<LocationFix, NmeaError> {
    require(fields, SentenceKind::Rmc, 10)?;

    if fields[2] != "A" {
        return Err(NmeaError::NoFix);
    }
    let mode = fields.get(12).copied().unwrap_or_default();
    let quality = FixQuality::from_mode(mode).ok_or(NmeaError::NoFix)?;
    let (latitude, longitude) = parse_position(&fields[3..7])?;

    let mut fix = LocationFix::new(latitude, longitude, quality, SentenceKind::Rmc);
    fix.time = parse_time(fields[1])?;
    fix.speed_mps = parse_number::<f32>(fields[7], "speed")?.map(|knots| knots * KNOTS_TO_MPS);
    fix.course_deg = parse_number(fields[8], "course")?;
    fix.date = parse_date(fields[9])?;
    Ok(fix)
}

/// `$xxGLL,lat,N,lon,E,time,status[,mode]`
fn parse_gll(fields: &[&str]) -> Result<LocationFix, NmeaError> {
    require(fields, SentenceKind::Gll, 7)?;

    if fields[6] != "A" {
        return Err(NmeaError::NoFix);
    }
    let mode = fields.get(7).copied().unwrap_or_default();
    let quality = FixQuality::from_mode(mode).ok_or(NmeaError::NoFix)?;
    let (latitude, longitude) = parse_position(&fields[1..5])?;

    let mut fix = LocationFix::new(latitude, longitude, quality, SentenceKind::Gll);
    fix.time = parse_time(fields[5])?;
    Ok(fix)
}

/// `lat, N/S, lon, E/W`; any empty field means there is no fix
fn parse_position(fields: &[&str]) -> Result<(f64, f64), NmeaError> {
    if fields.iter().any(|f| f.is_empty()) {
        return Err(NmeaError::NoFix);
    }
    let latitude = parse_coordinate(fields[0], fields[1], "latitude", ('N', 'S'), 90.0)?;
    let longitude = parse_coordinate(fields[2], fields[3], "longitude", ('E', 'W'), 180.0)?;
    Ok((latitude, longitude))
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere, to signed decimal degrees
fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    field: &'static str,
    (positive, negative): (char, char),
    limit: f64,
) -> Result<f64, NmeaError> {
    let invalid = || NmeaError::InvalidField {
        field,
        value: format!("{},{}", value, hemisphere),
    };

    let raw = value.parse::<f64>().map_err(|_| invalid())?;
    if raw.is_nan() || raw < 0.0 {
        return Err(invalid());
    }
    let degrees = (raw / 100.0).floor();
    let minutes = raw - degrees * 100.0;
    if !(0.0..60.0).contains(&minutes) {
        return Err(invalid());
    }
    let decimal = degrees + minutes / 60.0;
    if decimal > limit {
        return Err(invalid());
    }

    match hemisphere.chars().next() {
        Some(c) if c == positive && hemisphere.len() == 1 => Ok(decimal),
        Some(c) if c == negative && hemisphere.len() == 1 => Ok(-decimal),
        _ => Err(invalid()),
    }
}

/// `hhmmss` with optional fractional seconds; empty means absent
fn parse_time(value: &str) -> Result<Option<UtcTime>, NmeaError> {
    if value.is_empty() {
        return Ok(None);
    }
    let invalid = || NmeaError::InvalidField {
        field: "time",
        value: value.to_string(),
    };
    if value.len() < 6 || !value.is_ascii() {
        return Err(invalid());
    }

    let hour = value[0..2].parse::<u8>().map_err(|_| invalid())?;
    let minute = value[2..4].parse::<u8>().map_err(|_| invalid())?;
    let second = value[4..].parse::<f32>().map_err(|_| invalid())?;
    // 60 allows for leap seconds
    if hour > 23 || minute > 59 || !(0.0..61.0).contains(&second) {
        return Err(invalid());
    }
    Ok(Some(UtcTime {
        hour,
        minute,
        second,
    }))
}

/// `ddmmyy`; empty means absent
fn parse_date(value: &str) -> Result<Option<Date>, NmeaError> {
    if value.is_empty() {
        return Ok(None);
    }
    let invalid = || NmeaError::InvalidField {
        field: "date",
        value: value.to_string(),
    };
    if value.len() != 6 || !value.is_ascii() {
        return Err(invalid());
    }

    let day = value[0..2].parse::<u8>().map_err(|_| invalid())?;
    let month = value[2..4].parse::<u8>().map_err(|_| invalid())?;
    let yy = value[4..6].parse::<u16>().map_err(|_| invalid())?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(invalid());
    }
    // Two-digit years pivot at 1980, the start of GPS time
    let year = if yy < 80 { 2000 + yy } else { 1900 + yy };
    Ok(Some(Date { year, month, day }))
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
) -> Result<Option<T>, NmeaError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| NmeaError::InvalidField {
            field,
            value: value.to_string(),
        })
}
