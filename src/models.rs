//! Canonical sensor records shared by every feed parser.

use serde::{Deserialize, Serialize};

use crate::aqi::aqi_from_pm;

// ---

/// Normalized reading for one physical sensor.
///
/// Built once per parse call and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    // ---
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub aqi_10m: i32,
    pub aqi_30m: i32,
    pub aqi_1h: i32,
    pub aqi_6h: i32,
    pub aqi_24h: i32,
    /// Unix timestamp of the sensor's most recent report.
    pub last_updated: i64,
}

/// PM2.5 samples (µg/m³) for the five trailing windows of one sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmWindows {
    pub pm_10m: f64,
    pub pm_30m: f64,
    pub pm_1h: f64,
    pub pm_6h: f64,
    pub pm_24h: f64,
}

/// Ordered set of readings; order follows discovery in the source payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorCollection {
    pub sensors: Vec<SensorReading>,
}

impl SensorReading {
    // ---
    /// Build a reading, scoring every window with the same humidity value.
    ///
    /// No validation happens here; callers filter invalid sensors first.
    pub fn from_pm(
        id: i64,
        latitude: f64,
        longitude: f64,
        pm: PmWindows,
        rh: Option<f64>,
        last_updated: i64,
    ) -> Self {
        // ---
        SensorReading {
            id,
            latitude,
            longitude,
            aqi_10m: aqi_from_pm(pm.pm_10m, rh),
            aqi_30m: aqi_from_pm(pm.pm_30m, rh),
            aqi_1h: aqi_from_pm(pm.pm_1h, rh),
            aqi_6h: aqi_from_pm(pm.pm_6h, rh),
            aqi_24h: aqi_from_pm(pm.pm_24h, rh),
            last_updated,
        }
    }

    /// Reduced view for bandwidth-constrained clients: id, location and the
    /// 10-minute AQI. Every other field is zero.
    pub fn compacted(&self) -> Self {
        SensorReading {
            id: self.id,
            latitude: self.latitude,
            longitude: self.longitude,
            aqi_10m: self.aqi_10m,
            ..SensorReading::default()
        }
    }
}

impl SensorCollection {
    // ---
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn compact(&self) -> SensorCollection {
        compact(self)
    }
}

impl From<Vec<SensorReading>> for SensorCollection {
    fn from(sensors: Vec<SensorReading>) -> Self {
        SensorCollection { sensors }
    }
}

/// Project a collection down to its compacted readings, preserving order.
pub fn compact(collection: &SensorCollection) -> SensorCollection {
    collection
        .sensors
        .iter()
        .map(SensorReading::compacted)
        .collect::<Vec<_>>()
        .into()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn create_test_reading(id: i64, pm: f64) -> SensorReading {
        // ---
        let windows = PmWindows {
            pm_10m: pm,
            pm_30m: pm + 10.0,
            pm_1h: pm + 20.0,
            pm_6h: pm + 30.0,
            pm_24h: pm + 40.0,
        };
        SensorReading::from_pm(id, 37.77, -122.41, windows, None, 1_600_000_000)
    }

    #[test]
    fn test_builder_scores_each_window() {
        // ---
        let reading = create_test_reading(7, 12.0);

        assert_eq!(reading.id, 7);
        assert_eq!(reading.aqi_10m, aqi_from_pm(12.0, None));
        assert_eq!(reading.aqi_30m, aqi_from_pm(22.0, None));
        assert_eq!(reading.aqi_1h, aqi_from_pm(32.0, None));
        assert_eq!(reading.aqi_6h, aqi_from_pm(42.0, None));
        assert_eq!(reading.aqi_24h, aqi_from_pm(52.0, None));
        assert_eq!(reading.last_updated, 1_600_000_000);
    }

    #[test]
    fn test_builder_uses_same_humidity_for_all_windows() {
        // ---
        let windows = PmWindows {
            pm_10m: 10.0,
            pm_30m: 20.0,
            pm_1h: 30.0,
            pm_6h: 40.0,
            pm_24h: 50.0,
        };
        let reading = SensorReading::from_pm(1, 1.0, 2.0, windows, Some(45.0), 0);

        assert_eq!(reading.aqi_10m, aqi_from_pm(10.0, Some(45.0)));
        assert_eq!(reading.aqi_30m, aqi_from_pm(20.0, Some(45.0)));
        assert_eq!(reading.aqi_1h, aqi_from_pm(30.0, Some(45.0)));
        assert_eq!(reading.aqi_6h, aqi_from_pm(40.0, Some(45.0)));
        assert_eq!(reading.aqi_24h, aqi_from_pm(50.0, Some(45.0)));
    }

    #[test]
    fn test_compact_keeps_identity_and_10m_only() {
        // ---
        let full: SensorCollection = vec![
            create_test_reading(1, 5.0),
            create_test_reading(2, 60.0),
            create_test_reading(3, 200.0),
        ]
        .into();

        let compacted = compact(&full);

        assert_eq!(compacted.len(), full.len());
        for (small, big) in compacted.sensors.iter().zip(&full.sensors) {
            assert_eq!(small.id, big.id);
            assert_eq!(small.latitude, big.latitude);
            assert_eq!(small.longitude, big.longitude);
            assert_eq!(small.aqi_10m, big.aqi_10m);
            assert_eq!(small.aqi_30m, 0);
            assert_eq!(small.aqi_1h, 0);
            assert_eq!(small.aqi_6h, 0);
            assert_eq!(small.aqi_24h, 0);
            assert_eq!(small.last_updated, 0);
        }
    }

    #[test]
    fn test_compact_is_idempotent() {
        // ---
        let full: SensorCollection = vec![create_test_reading(9, 33.0), create_test_reading(4, 1.0)].into();

        let once = full.compact();
        assert_eq!(once.compact(), once);
    }

    #[test]
    fn test_compact_empty_collection() {
        // ---
        assert!(compact(&SensorCollection::default()).is_empty());
    }
}
