//! Length unit helpers. All board coordinates are millimeters; these
//! convert the other units that appear in datasheets and design rules.

/// Convert inches to millimeters.
pub fn inches(x: f64) -> f64 {
    x * 25.4
}

/// Convert mils (thousandths of an inch) to millimeters.
pub fn mils(x: f64) -> f64 {
    inches(x / 1000.0)
}

/// Convert microns to millimeters.
pub fn microns(x: f64) -> f64 {
    x / 1000.0
}

/// Convert radians to degrees.
pub fn degrees(r: f64) -> f64 {
    r.to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert!((inches(1.0) - 25.4).abs() < 1e-12);
        assert!((mils(1000.0) - 25.4).abs() < 1e-12);
        assert!((microns(1000.0) - 1.0).abs() < 1e-12);
        assert!((degrees(std::f64::consts::PI) - 180.0).abs() < 1e-12);
    }
}
