use crate::limits::Limits;
use std::fmt;

/// Outcome of a phase-space construction step. A rejected point is an
/// ordinary result with zero weight, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseSpace<T> {
    Accepted(T),
    Rejected(Rejection),
}

impl<T> PhaseSpace<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PhaseSpace::Accepted(_))
    }

    pub fn accepted(self) -> Option<T> {
        match self {
            PhaseSpace::Accepted(t) => Some(t),
            PhaseSpace::Rejected(_) => None,
        }
    }
}

/// Why a trial point lies outside the physical region.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Rejection {
    /// A Källén function or a discriminant is not positive.
    NonPositive(&'static str, f64),
    /// A quantity that must be negative is not.
    NonNegative(&'static str, f64),
    /// A mapping range is empty or cannot be mapped.
    EmptyRange(&'static str),
    /// The momentum-transfer cut excludes the whole allowed range.
    MomentumTransferCut,
    /// A sine or cosine falls outside `[-1, 1]`.
    Angle(&'static str, f64),
    /// A kinematic cut on the final state failed.
    Cut(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::NonPositive(name, v) => write!(f, "{} = {:e} <= 0", name, v),
            Rejection::NonNegative(name, v) => write!(f, "{} = {:e} >= 0", name, v),
            Rejection::EmptyRange(name) => write!(f, "empty range for {}", name),
            Rejection::MomentumTransferCut => write!(f, "t1 range excluded by the Q2 cut"),
            Rejection::Angle(name, v) => write!(f, "|{}| = {:e} > 1", name, v),
            Rejection::Cut(name) => write!(f, "failed cut on {}", name),
        }
    }
}

/// Masses of the external legs of `A B -> X (l+ l-) Y`, stored squared
/// along with the differences used throughout the kinematics.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Masses {
    /// `m_A^2`
    pub w1: f64,
    /// `m_B^2`
    pub w2: f64,
    pub mx: f64,
    pub my: f64,
    pub mx2: f64,
    pub my2: f64,
    /// Squared mass of each central lepton.
    pub ml2: f64,
    pub w12: f64,
    pub w31: f64,
    pub w52: f64,
}

impl Masses {
    pub fn new(m_a: f64, m_b: f64, mx: f64, my: f64, ml: f64) -> Masses {
        let (w1, w2) = (m_a * m_a, m_b * m_b);
        let (mx2, my2) = (mx * mx, my * my);
        Masses {
            w1,
            w2,
            mx,
            my,
            mx2,
            my2,
            ml2: ml * ml,
            w12: w1 - w2,
            w31: mx2 - w1,
            w52: my2 - w2,
        }
    }
}

/// Power-law mapping of `x` onto `[min, max]`, returning the value and the Jacobian.
pub fn map_power_law(x: f64, min: f64, max: f64, name: &'static str) -> PhaseSpace<(f64, f64)> {
    match Limits::new(min, max).and_then(|l| l.power_law(x)) {
        Some(r) if r.0.is_finite() && r.1.is_finite() => PhaseSpace::Accepted(r),
        _ => PhaseSpace::Rejected(Rejection::EmptyRange(name)),
    }
}

/// Mapping of `x` onto `[min, max]` flattening the `1/λ(v, y, z)` behaviour
/// near the Källén edges of the range.
pub fn map_triangle(
    y: f64,
    z: f64,
    x: f64,
    min: f64,
    max: f64,
    name: &'static str,
) -> PhaseSpace<(f64, f64)> {
    if !(min <= max) {
        return PhaseSpace::Rejected(Rejection::EmptyRange(name));
    }
    let xmb = min - y - z;
    let xpb = max - y - z;
    let c = -4. * y * z;
    let alp = (xpb * xpb + c).sqrt();
    let alm = (xmb * xmb + c).sqrt();
    let am = xmb + alm;
    let ap = xpb + alp;
    let yy = ap / am;
    let zz = yy.powf(x);

    let out = y + z + 0.5 * (am * zz - c / (am * zz));
    let ax = ((out - y - z).powi(2) + c).sqrt();
    let jac = ax * yy.ln();
    if out.is_finite() && jac.is_finite() {
        PhaseSpace::Accepted((out, jac))
    } else {
        PhaseSpace::Rejected(Rejection::EmptyRange(name))
    }
}

/// Unwrap an accepted value or return the rejection from the enclosing function.
#[macro_export]
macro_rules! accept {
    ($e:expr) => {
        match $e {
            $crate::kinematics::PhaseSpace::Accepted(v) => v,
            $crate::kinematics::PhaseSpace::Rejected(r) => {
                return $crate::kinematics::PhaseSpace::Rejected(r)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_law_rejects_mixed_signs() {
        assert!(!map_power_law(0.5, -1., 1., "x").is_accepted());
        assert!(!map_power_law(0.5, 2., 1., "x").is_accepted());
        let (v, j) = map_power_law(0.5, 1., 100., "x").accepted().unwrap();
        assert!((v - 10.).abs() < 1e-12);
        assert!((j - 10. * 100f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn triangle_map_covers_range() {
        let (y, z) = (-2.5, 0.88);
        let (lo, _) = map_triangle(y, z, 0., 4., 900., "s2").accepted().unwrap();
        let (hi, _) = map_triangle(y, z, 1., 4., 900., "s2").accepted().unwrap();
        assert!((lo - 4.).abs() < 1e-9);
        assert!((hi - 900.).abs() < 1e-6);

        // the Jacobian is the derivative of the map
        let h = 1e-6;
        let (a, _) = map_triangle(y, z, 0.4 - h, 4., 900., "s2").accepted().unwrap();
        let (b, _) = map_triangle(y, z, 0.4 + h, 4., 900., "s2").accepted().unwrap();
        let (_, jac) = map_triangle(y, z, 0.4, 4., 900., "s2").accepted().unwrap();
        assert!(((b - a) / (2. * h) - jac).abs() / jac < 1e-5);
    }
}
