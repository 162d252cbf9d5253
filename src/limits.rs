use crate::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// A range with optional lower and upper bounds.
///
/// An unset bound is `None`. When both bounds are set, `min <= max`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLimits")]
pub struct Limits {
    min: Option<f64>,
    max: Option<f64>,
}

/// Bounds as read from a configuration file, before validation.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawLimits {
    min: Option<f64>,
    max: Option<f64>,
}

impl TryFrom<RawLimits> for Limits {
    type Error = ConfigurationError;

    fn try_from(raw: RawLimits) -> Result<Limits, ConfigurationError> {
        match (raw.min, raw.max) {
            (Some(min), Some(max)) if !(min <= max) => Err(ConfigurationError::InvalidSetting(
                format!("reversed range [{}, {}]", min, max),
            )),
            (min, max) => Ok(Limits { min, max }),
        }
    }
}

impl Limits {
    /// A closed range. Returns `None` for a reversed or NaN range.
    pub fn new(min: f64, max: f64) -> Option<Limits> {
        if min <= max {
            Some(Limits {
                min: Some(min),
                max: Some(max),
            })
        } else {
            None
        }
    }

    pub fn unbounded() -> Limits {
        Limits::default()
    }

    pub fn with_min(min: f64) -> Limits {
        Limits {
            min: Some(min),
            max: None,
        }
    }

    pub fn with_max(max: f64) -> Limits {
        Limits {
            min: None,
            max: Some(max),
        }
    }

    pub fn unit() -> Limits {
        Limits {
            min: Some(0.),
            max: Some(1.),
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn has_min(&self) -> bool {
        self.min.is_some()
    }

    pub fn has_max(&self) -> bool {
        self.max.is_some()
    }

    /// Both bounds are set.
    pub fn is_bounded(&self) -> bool {
        self.has_min() && self.has_max()
    }

    /// At least one bound is set and the range is not reversed.
    pub fn is_valid(&self) -> bool {
        match (self.min, self.max) {
            (None, None) => false,
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    /// Set the lower bound, keeping the range ordered.
    pub fn set_min(&mut self, min: f64) {
        self.min = Some(min);
        if let Some(max) = self.max {
            if max < min {
                self.max = Some(min);
            }
        }
    }

    /// Set the upper bound, keeping the range ordered.
    pub fn set_max(&mut self, max: f64) {
        self.max = Some(max);
        if let Some(min) = self.min {
            if min > max {
                self.min = Some(max);
            }
        }
    }

    /// Width of the range, or `None` if a bound is unset.
    pub fn range(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }

    pub fn mean(&self) -> Option<f64> {
        Some(0.5 * (self.max? + self.min?))
    }

    /// `true` if `v` satisfies every set bound.
    pub fn contains(&self, v: f64) -> bool {
        if let Some(min) = self.min {
            if v < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if v > max {
                return false;
            }
        }
        true
    }

    /// Bring `v` into the range.
    pub fn clip(&self, v: f64) -> f64 {
        let mut v = v;
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }

    /// Intersection with another range. `None` if they do not overlap.
    pub fn truncate(&self, other: &Limits) -> Option<Limits> {
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match (min, max) {
            (Some(a), Some(b)) if a > b => None,
            _ => Some(Limits { min, max }),
        }
    }

    /// Linear map of `v` in `[0, 1]` onto the range.
    pub fn x(&self, v: f64) -> Option<f64> {
        Some(self.min? + v * self.range()?)
    }

    /// Inverse of [`Limits::x`].
    pub fn inverse_x(&self, value: f64) -> Option<f64> {
        let range = self.range()?;
        if range == 0. {
            return None;
        }
        Some((value - self.min?) / range)
    }

    /// Power-law map of `v` in `[0, 1]` onto the range,
    /// `out = min * (max / min)^v`, returning the value and its derivative.
    /// Both bounds must be set, non-zero and of the same sign.
    pub fn power_law(&self, v: f64) -> Option<(f64, f64)> {
        let (min, max) = (self.min?, self.max?);
        let ratio = max / min;
        if !(ratio > 0.) || !ratio.is_finite() {
            return None;
        }
        let out = min * ratio.powf(v);
        Some((out, out * ratio.ln()))
    }

    /// Inverse of [`Limits::power_law`].
    pub fn inverse_power_law(&self, value: f64) -> Option<f64> {
        let (min, max) = (self.min?, self.max?);
        let ratio = max / min;
        if !(ratio > 0.) || ratio == 1. || !ratio.is_finite() {
            return None;
        }
        Some((value / min).ln() / ratio.ln())
    }

    /// Split a bounded range into `n` contiguous sub-ranges of equal width.
    pub fn split(&self, n: usize) -> Vec<Limits> {
        match (self.min, self.range()) {
            (Some(min), Some(range)) if n > 0 => {
                let width = range / n as f64;
                (0..n)
                    .map(|i| Limits {
                        min: Some(min + width * i as f64),
                        max: Some(if i + 1 == n {
                            min + range
                        } else {
                            min + width * (i + 1) as f64
                        }),
                    })
                    .collect()
            }
            _ => vec![],
        }
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.min {
            Some(min) => write!(f, "[{}, ", min)?,
            None => write!(f, "(-inf, ")?,
        }
        match self.max {
            Some(max) => write!(f, "{}]", max),
            None => write!(f, "+inf)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_range_is_rejected() {
        assert!(Limits::new(2., 1.).is_none());
        assert!(Limits::new(1., 1.).is_some());
        assert!(!Limits::unbounded().is_valid());
        assert!(Limits::with_min(3.).is_valid());
    }

    #[test]
    fn containment_and_clipping() {
        let l = Limits::with_max(4.);
        assert!(l.contains(-1e9));
        assert!(!l.contains(4.5));
        assert_eq!(l.clip(5.), 4.);

        let l = Limits::new(-1., 1.).unwrap();
        assert_eq!(l.clip(-3.), -1.);
        assert_eq!(l.range(), Some(2.));
    }

    #[test]
    fn setters_keep_order() {
        let mut l = Limits::new(0., 1.).unwrap();
        l.set_min(2.);
        assert_eq!(l.max(), Some(2.));
        l.set_max(-1.);
        assert_eq!(l.min(), Some(-1.));
    }

    #[test]
    fn linear_round_trip() {
        let l = Limits::new(-3., 7.).unwrap();
        for &v in &[0., 0.125, 0.5, 0.9, 1.] {
            let x = l.x(v).unwrap();
            assert!(l.contains(x));
            assert!((l.inverse_x(x).unwrap() - v).abs() < 1e-12);
        }
    }

    #[test]
    fn power_law_round_trip() {
        for l in &[
            Limits::new(1e-4, 1e3).unwrap(),
            Limits::new(-250., -1e-6).unwrap(),
        ] {
            for &v in &[0., 0.3, 0.77, 1.] {
                let (x, jac) = l.power_law(v).unwrap();
                assert!(jac != 0.);
                assert!((l.inverse_power_law(x).unwrap() - v).abs() < 1e-10);
            }
        }
        assert!(Limits::new(-1., 1.).unwrap().power_law(0.5).is_none());
        assert!(Limits::new(0., 1.).unwrap().power_law(0.5).is_none());
    }

    #[test]
    fn intersection_and_split() {
        let a = Limits::new(0., 10.).unwrap();
        let b = Limits::with_min(4.);
        assert_eq!(a.truncate(&b), Limits::new(4., 10.));
        assert!(a.truncate(&Limits::with_min(11.)).is_none());

        let parts = a.split(4);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1], Limits::new(2.5, 5.).unwrap());
        assert_eq!(parts[3].max(), Some(10.));
    }

    #[test]
    fn deserialize_partial_bounds() {
        let l: Limits = serde_yaml::from_str("min: 1.5").unwrap();
        assert_eq!(l, Limits::with_min(1.5));
        let l: Limits = serde_yaml::from_str("{min: 0., max: 2.}").unwrap();
        assert_eq!(l.range(), Some(2.));
        let l: Limits = serde_yaml::from_str("{}").unwrap();
        assert_eq!(l, Limits::unbounded());
        let l: Limits = serde_yaml::from_str("{min: 0., max: 0.}").unwrap();
        assert_eq!(l.range(), Some(0.));

        let err = serde_yaml::from_str::<Limits>("{min: 10., max: 1.}").unwrap_err();
        assert!(err.to_string().contains("reversed range"), "{}", err);
    }
}
