// ============================================================================
// DateTime : format d'échange et parsing tolérant
// ============================================================================
// Les CSV et le JSON du backend utilisent des dates "naïves" (sans fuseau).
// Elles sont interprétées comme UTC ; un RFC 3339 avec offset est converti.
//
// Format canonique (JSON / CSV d'exemple) : 2024-01-01 09:30:00
// ============================================================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Format utilisé pour sérialiser les timestamps
pub const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats date+heure acceptés en entrée, essayés dans l'ordre
///
/// %.f accepte aussi l'absence de fractions de seconde.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Formats date seule (minuit)
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse une date dans l'un des formats reconnus
///
/// Retourne None si aucun format ne correspond.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Formate un timestamp au format d'échange
pub fn format_wire(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(WIRE_FORMAT).to_string()
}

// ============================================================================
// Adaptateurs serde : #[serde(with = "crate::models::datetime")]
// ============================================================================

pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_wire(timestamp))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid DateTime '{}'", raw)))
}
