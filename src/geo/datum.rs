//! WGS-84 to GCJ-02 conversion, required by map services operating in mainland China.
//!
//! GCJ-02 applies a non-linear, obfuscating offset of a few hundred metres. Positions
//! outside China are left unchanged, matching what those services expect.

use crate::structs::Coordinate;
use std::f64::consts::PI;

/// Semi-major axis of the Krasovsky 1940 ellipsoid.
const SEMI_MAJOR_AXIS: f64 = 6_378_245.0;
const ECCENTRICITY_SQUARED: f64 = 0.006_693_421_622_965_943;

/// Rough bounding box of mainland China.
pub fn out_of_china(coordinate: Coordinate) -> bool {
    !(72.004..=137.8347).contains(&coordinate.longitude)
        || !(0.8293..=55.8271).contains(&coordinate.latitude)
}

fn latitude_offset(x: f64, y: f64) -> f64 {
    let mut offset = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    offset += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    offset += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    offset += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    offset
}

fn longitude_offset(x: f64, y: f64) -> f64 {
    let mut offset = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    offset += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    offset += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    offset += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    offset
}

pub fn wgs84_to_gcj02(coordinate: Coordinate) -> Coordinate {
    if out_of_china(coordinate) {
        return coordinate;
    }
    let x = coordinate.longitude - 105.0;
    let y = coordinate.latitude - 35.0;
    let radians = coordinate.latitude / 180.0 * PI;
    let magic = 1.0 - ECCENTRICITY_SQUARED * radians.sin().powi(2);
    let sqrt_magic = magic.sqrt();

    let d_latitude = (latitude_offset(x, y) * 180.0)
        / ((SEMI_MAJOR_AXIS * (1.0 - ECCENTRICITY_SQUARED)) / (magic * sqrt_magic) * PI);
    let d_longitude =
        (longitude_offset(x, y) * 180.0) / (SEMI_MAJOR_AXIS / sqrt_magic * radians.cos() * PI);
    Coordinate::new(coordinate.latitude + d_latitude, coordinate.longitude + d_longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beijing_is_shifted_north_east() {
        let wgs = Coordinate::new(39.908_823, 116.397_470);
        let gcj = wgs84_to_gcj02(wgs);
        let d_latitude = gcj.latitude - wgs.latitude;
        let d_longitude = gcj.longitude - wgs.longitude;
        assert!((0.0005..0.003).contains(&d_latitude), "{d_latitude}");
        assert!((0.003..0.009).contains(&d_longitude), "{d_longitude}");
    }

    #[test]
    fn test_shift_stays_under_a_kilometre_in_shenzhen() {
        let wgs = Coordinate::new(22.5431, 114.0579);
        let gcj = wgs84_to_gcj02(wgs);
        assert_ne!(gcj, wgs);
        assert!((gcj.latitude - wgs.latitude).abs() < 0.01);
        assert!((gcj.longitude - wgs.longitude).abs() < 0.01);
    }

    #[test]
    fn test_positions_outside_china_are_untouched() {
        let amsterdam = Coordinate::new(52.379_189, 4.899_431);
        assert!(out_of_china(amsterdam));
        assert_eq!(wgs84_to_gcj02(amsterdam), amsterdam);

        let tokyo = Coordinate::new(35.6895, 139.6917);
        assert_eq!(wgs84_to_gcj02(tokyo), tokyo);
    }
}
