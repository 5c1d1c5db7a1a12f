//! PM2.5 to US EPA Air Quality Index conversion.
//!
//! Pure numeric helpers with no I/O. The breakpoint table is kept as data so
//! the band selection reads top-down, highest concentration first.

// ---

/// One row of the EPA PM2.5 breakpoint table.
#[derive(Debug, Clone, Copy)]
struct Band {
    /// A concentration strictly above this value selects the band.
    above: f64,
    aqi_high: f64,
    aqi_low: f64,
    pm_high: f64,
    pm_low: f64,
}

/// Bands in descending order of lower bound; the first match wins.
#[rustfmt::skip]
const BANDS: [Band; 6] = [
    Band { above: 350.5, aqi_high: 500.0, aqi_low: 401.0, pm_high: 500.0, pm_low: 350.5 },
    Band { above: 250.5, aqi_high: 400.0, aqi_low: 301.0, pm_high: 350.4, pm_low: 250.5 },
    Band { above: 150.5, aqi_high: 300.0, aqi_low: 201.0, pm_high: 250.4, pm_low: 150.5 },
    Band { above: 55.5, aqi_high: 200.0, aqi_low: 151.0, pm_high: 150.4, pm_low: 55.5 },
    Band { above: 35.5, aqi_high: 150.0, aqi_low: 101.0, pm_high: 55.4, pm_low: 35.5 },
    Band { above: 12.1, aqi_high: 100.0, aqi_low: 51.0, pm_high: 35.4, pm_low: 12.1 },
];

/// Used when the concentration is at or below every other band's bound.
const GOOD: Band = Band {
    // Unused; reached through `unwrap_or`.
    above: f64::NEG_INFINITY,
    aqi_high: 50.0,
    aqi_low: 0.0,
    pm_high: 12.0,
    pm_low: 0.0,
};

/// Convert a PM2.5 concentration (µg/m³) to a US AQI score.
///
/// When `rh` (relative humidity, %) is available the EPA correction is
/// applied first. Sensors without humidity telemetry are scored on their raw
/// PM2.5 value.
pub fn aqi_from_pm(pm: f64, rh: Option<f64>) -> i32 {
    // ---
    let corrected = match rh {
        Some(rh) => apply_epa_correction(pm, rh),
        None => pm,
    };

    let band = BANDS
        .iter()
        .find(|band| corrected > band.above)
        .unwrap_or(&GOOD);

    band.interpolate(corrected)
}

/// EPA humidity correction for low-cost PM2.5 sensors.
///
/// Floored at zero: very low concentrations combined with very high humidity
/// otherwise produce negative values.
pub fn apply_epa_correction(pm: f64, rh: f64) -> f64 {
    (0.534 * pm - 0.0844 * rh + 5.604).max(0.0)
}

impl Band {
    /// Linear interpolation within the band, rounded half away from zero.
    fn interpolate(&self, pm: f64) -> i32 {
        let slope = (self.aqi_high - self.aqi_low) / (self.pm_high - self.pm_low);
        (slope * (pm - self.pm_low) + self.aqi_low).round() as i32
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_zero_concentration() {
        // ---
        assert_eq!(aqi_from_pm(0.0, None), 0);
    }

    #[test]
    fn test_good_band() {
        // ---
        assert_eq!(aqi_from_pm(12.0, None), 50);
        assert_eq!(aqi_from_pm(7.0, None), 29);
        assert_eq!(aqi_from_pm(6.0, None), 25);
    }

    #[test]
    fn test_band_lower_bound_belongs_to_band_below() {
        // ---
        // A value equal to a bound is not "above" it, so the lower band applies.
        assert_eq!(aqi_from_pm(12.1, None), 50);
        assert_eq!(aqi_from_pm(35.5, None), 100);
        assert_eq!(aqi_from_pm(55.5, None), 150);
        assert_eq!(aqi_from_pm(150.5, None), 200);
        assert_eq!(aqi_from_pm(250.5, None), 300);
        assert_eq!(aqi_from_pm(350.5, None), 400);
    }

    #[test]
    fn test_just_above_band_bound_selects_higher_band() {
        // ---
        assert_eq!(aqi_from_pm(12.2, None), 51);
        assert_eq!(aqi_from_pm(35.6, None), 101);
        assert_eq!(aqi_from_pm(55.6, None), 151);
        assert_eq!(aqi_from_pm(150.6, None), 201);
        assert_eq!(aqi_from_pm(250.6, None), 301);
        assert_eq!(aqi_from_pm(350.6, None), 401);
    }

    #[test]
    fn test_mid_band_values() {
        // ---
        assert_eq!(aqi_from_pm(41.0, None), 115);
        assert_eq!(aqi_from_pm(100.0, None), 174);
        assert_eq!(aqi_from_pm(500.0, None), 500);
    }

    #[test]
    fn test_epa_correction_applied_with_humidity() {
        // ---
        // 0.534 * 10 - 0.0844 * 50 + 5.604 = 6.724
        let corrected = apply_epa_correction(10.0, 50.0);
        assert!((corrected - 6.724).abs() < 1e-9);
        assert_eq!(aqi_from_pm(10.0, Some(50.0)), 28);
    }

    #[test]
    fn test_zero_humidity_still_corrects() {
        // ---
        // 0.534 * 10 + 5.604 = 10.944
        assert_eq!(aqi_from_pm(10.0, Some(0.0)), 46);
        assert_eq!(aqi_from_pm(10.0, None), 42);
    }

    #[test]
    fn test_epa_correction_floors_at_zero() {
        // ---
        // 0.534 - 8.44 + 5.604 < 0
        assert_eq!(apply_epa_correction(1.0, 100.0), 0.0);
        assert_eq!(aqi_from_pm(1.0, Some(100.0)), aqi_from_pm(0.0, None));
        assert_eq!(aqi_from_pm(100.0, Some(800.0)), 0);
    }
}
