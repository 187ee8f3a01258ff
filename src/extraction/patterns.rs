//! Coordinate-shaped text searches over raw media bytes.
//!
//! Container formats store locations as text in several places (the QuickTime `©xyz`
//! atom, Apple's ISO6709 metadata key, JSON sidecar blocks written by some phone
//! vendors). Scanning the bytes directly finds them without a container parser. The
//! pattern set is best-effort: a miss is the common outcome and never an error.

use crate::structs::Coordinate;
use regex::Regex;
use std::sync::LazyLock;

/// `±DD.DDDD±DDD.DDDD` with optional altitude and trailing slash.
static ISO6709: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([+-]\d{1,2}(?:\.\d+)?)([+-]\d{1,3}(?:\.\d+)?)(?:[+-]\d+(?:\.\d+)?)?(?:CRS[A-Z0-9_]+)?/?")
        .expect("valid ISO 6709 regex")
});

/// Patterns tried in order against the whole probe window. Each captures latitude in
/// group 1 and longitude in group 2.
static SCAN_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("iso6709", r"([+-]\d{1,2}\.\d{3,})([+-]\d{1,3}\.\d{3,})(?:[+-]\d+(?:\.\d+)?)?/"),
        ("space separated", r"([+-]?\d{1,2}\.\d{4,})[ \t]+([+-]?\d{1,3}\.\d{4,})"),
        (
            "json",
            r#""latitude"\s*:\s*"?(-?\d{1,2}(?:\.\d+)?)"?\s*,\s*"longitude"\s*:\s*"?(-?\d{1,3}(?:\.\d+)?)"?"#,
        ),
        ("quicktime xyz atom", r"(?s)\x{A9}xyz.{0,8}?([+-]\d{1,2}\.\d+)([+-]\d{1,3}\.\d+)"),
        (
            "apple location key",
            r"(?s)com\.apple\.quicktime\.location\.ISO6709.{0,64}?([+-]\d{1,2}\.\d+)([+-]\d{1,3}\.\d+)",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid coordinate regex")))
    .collect()
});

/// Decodes bytes one-to-one into chars (ISO-8859-1), so every byte offset survives and
/// binary noise cannot break UTF-8 decoding.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

fn coordinate_from(latitude: &str, longitude: &str) -> Option<Coordinate> {
    let coordinate = Coordinate::new(latitude.parse().ok()?, longitude.parse().ok()?);
    coordinate.is_plausible().then_some(coordinate)
}

/// Parses an ISO 6709 location string such as `+37.7749-122.4194/` (the trailing slash
/// and an altitude component are optional).
pub fn parse_iso6709(value: &str) -> Option<Coordinate> {
    let captures = ISO6709.captures(value.trim())?;
    coordinate_from(captures.get(1)?.as_str(), captures.get(2)?.as_str())
}

/// Parses a container location field: ISO 6709 first, then `lat lon [alt]` as some
/// metadata readers render it.
pub fn parse_location_field(value: &str) -> Option<Coordinate> {
    parse_iso6709(value).or_else(|| {
        let mut parts = value.split([' ', ',']).filter(|part| !part.is_empty());
        coordinate_from(parts.next()?, parts.next()?)
    })
}

/// Searches raw bytes for the first plausible coordinate, trying patterns in order.
pub fn scan_for_coordinate(bytes: &[u8]) -> Option<(Coordinate, &'static str)> {
    let text = latin1(bytes);
    SCAN_PATTERNS.iter().find_map(|(name, pattern)| {
        pattern
            .captures_iter(&text)
            .find_map(|captures| coordinate_from(captures.get(1)?.as_str(), captures.get(2)?.as_str()))
            .map(|coordinate| (coordinate, *name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(coordinate: Coordinate, latitude: f64, longitude: f64) {
        assert!((coordinate.latitude - latitude).abs() < 1e-9, "{coordinate:?}");
        assert!((coordinate.longitude - longitude).abs() < 1e-9, "{coordinate:?}");
    }

    #[test]
    fn test_iso6709_with_slash() {
        assert_close(parse_iso6709("+37.7749-122.4194/").unwrap(), 37.7749, -122.4194);
    }

    #[test]
    fn test_iso6709_variants() {
        assert_close(parse_iso6709("+37.7749-122.4194").unwrap(), 37.7749, -122.4194);
        assert_close(parse_iso6709("-33.8688+151.2093+012.000/").unwrap(), -33.8688, 151.2093);
        assert_close(
            parse_iso6709("+35.6895+139.6917+040.000CRSWGS_84/").unwrap(),
            35.6895,
            139.6917,
        );
        assert!(parse_iso6709("hello").is_none());
        assert!(parse_iso6709("+00.0000+000.0000/").is_none(), "null island is no fix");
    }

    #[test]
    fn test_location_field_accepts_space_separated() {
        assert_close(parse_location_field("52.3792 4.8994 12.5").unwrap(), 52.3792, 4.8994);
        assert_close(parse_location_field("+52.3792+004.8994/").unwrap(), 52.3792, 4.8994);
        assert!(parse_location_field("").is_none());
    }

    #[test]
    fn test_scan_finds_xyz_atom_in_binary() {
        let mut bytes = vec![0u8, 0, 0, 0x1e, 0xa9, b'x', b'y', b'z', 0x00, 0x12, 0x15, 0xc7];
        bytes.extend_from_slice(b"+31.2304+121.4737/");
        bytes.extend_from_slice(&[0xff, 0xfe, 0x00]);

        let (coordinate, pattern) = scan_for_coordinate(&bytes).unwrap();
        assert_close(coordinate, 31.2304, 121.4737);
        assert_eq!(pattern, "iso6709");
    }

    #[test]
    fn test_scan_finds_json_block() {
        let bytes = br#"....{"make":"x","latitude":22.5431,"longitude":114.0579}...."#;
        let (coordinate, pattern) = scan_for_coordinate(bytes).unwrap();
        assert_close(coordinate, 22.5431, 114.0579);
        assert_eq!(pattern, "json");
    }

    #[test]
    fn test_scan_finds_space_separated_pair() {
        let bytes = b"\x00\x01loc 48.85837 2.29448 \x00";
        let (coordinate, pattern) = scan_for_coordinate(bytes).unwrap();
        assert_close(coordinate, 48.85837, 2.29448);
        assert_eq!(pattern, "space separated");
    }

    #[test]
    fn test_scan_skips_implausible_candidates() {
        let bytes = b"+99.0000+500.0000/ noise +45.4642+009.1900/";
        let (coordinate, _) = scan_for_coordinate(bytes).unwrap();
        assert_close(coordinate, 45.4642, 9.19);
    }

    #[test]
    fn test_scan_of_noise_finds_nothing() {
        let bytes: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        assert!(scan_for_coordinate(&bytes).is_none());
    }

    #[test]
    fn test_latin1_keeps_every_byte() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(latin1(&bytes).chars().count(), 256);
    }
}
