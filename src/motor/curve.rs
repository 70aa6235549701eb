// Easing curves for speed ramps
//
// Each curve maps normalized time t in [0, 1] to progress in [0, 1],
// with f(0) = 0 and f(1) = 1.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    #[default]
    #[serde(alias = "LINEAR")]
    Linear,
    #[serde(alias = "EASE_IN")]
    EaseIn,
    #[serde(alias = "EASE_OUT")]
    EaseOut,
    #[serde(alias = "EASE_IN_OUT")]
    EaseInOut,
}

impl Curve {
    /// Progress at normalized time `t`
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Curve::Linear => t,
            Curve::EaseIn => t * t,
            Curve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Curve::EaseInOut => 0.5 * (1.0 - (PI * t).cos()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Curve; 4] = [Curve::Linear, Curve::EaseIn, Curve::EaseOut, Curve::EaseInOut];

    #[test]
    fn test_endpoints() {
        for curve in ALL {
            assert!(curve.apply(0.0).abs() < 1e-6, "{:?} at 0", curve);
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-6, "{:?} at 1", curve);
        }
    }

    #[test]
    fn test_midpoints() {
        assert_eq!(Curve::Linear.apply(0.5), 0.5);
        assert_eq!(Curve::EaseIn.apply(0.5), 0.25);
        assert_eq!(Curve::EaseOut.apply(0.5), 0.75);
        assert!((Curve::EaseInOut.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_curves_stay_in_unit_range() {
        for curve in ALL {
            for i in 0..=100 {
                let p = curve.apply(i as f32 / 100.0);
                assert!((-1e-6..=1.0 + 1e-6).contains(&p), "{:?} gave {}", curve, p);
            }
        }
    }

    #[test]
    fn test_curve_names() {
        let c: Curve = serde_json::from_str("\"ease_in_out\"").unwrap();
        assert_eq!(c, Curve::EaseInOut);
        let c: Curve = serde_json::from_str("\"EASE_OUT\"").unwrap();
        assert_eq!(c, Curve::EaseOut);
        assert!(serde_json::from_str::<Curve>("\"bounce\"").is_err());
    }
}
