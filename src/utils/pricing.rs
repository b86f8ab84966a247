use crate::config::FareSettings;

/// Fare for a completed ride: base fare plus distance and duration charges,
/// rounded to two decimal places.
pub fn compute_fare(settings: &FareSettings, distance_km: f64, duration_minutes: f64) -> f64 {
    let raw = settings.base_fare
        + settings.per_km_rate * distance_km.max(0.0)
        + settings.per_minute_rate * duration_minutes.max(0.0);
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> FareSettings {
        FareSettings {
            base_fare: 2.5,
            per_km_rate: 1.2,
            per_minute_rate: 0.3,
        }
    }

    #[test]
    fn test_base_fare_only() {
        assert_eq!(compute_fare(&settings(), 0.0, 0.0), 2.5);
    }

    #[test]
    fn test_distance_and_duration() {
        // 2.5 + 1.2 * 10 + 0.3 * 20 = 20.5
        assert_eq!(compute_fare(&settings(), 10.0, 20.0), 20.5);
    }

    #[test]
    fn test_rounding() {
        // 2.5 + 1.2 * 3.333 = 6.4996 -> 6.5
        assert_eq!(compute_fare(&settings(), 3.333, 0.0), 6.5);
    }

    #[test]
    fn test_negative_inputs_clamped() {
        assert_eq!(compute_fare(&settings(), -5.0, -10.0), 2.5);
    }
}
