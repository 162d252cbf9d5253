use std::fmt;
use std::ops::{Add, AddAssign, Index, Mul, Neg, Sub, SubAssign};

mod serialization;

/// A four-momentum `(px, py, pz, E)` with a cached norm of its
/// three-momentum. The cache is refreshed by every setter.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Momentum {
    px: f64,
    py: f64,
    pz: f64,
    e: f64,
    p: f64,
}

impl Momentum {
    pub fn new() -> Momentum {
        Momentum::default()
    }

    pub fn from_px_py_pz_e(px: f64, py: f64, pz: f64, e: f64) -> Momentum {
        let mut mom = Momentum {
            px,
            py,
            pz,
            e,
            p: 0.,
        };
        mom.compute_p();
        mom
    }

    /// Build an on-shell momentum of mass `m`.
    pub fn from_px_py_pz_m(px: f64, py: f64, pz: f64, m: f64) -> Momentum {
        let mut mom = Momentum::from_px_py_pz_e(px, py, pz, 0.);
        mom.set_mass(m);
        mom
    }

    pub fn from_pt_eta_phi(pt: f64, eta: f64, phi: f64, e: f64) -> Momentum {
        Momentum::from_px_py_pz_e(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh(), e)
    }

    pub fn from_p_theta_phi(p: f64, theta: f64, phi: f64, e: f64) -> Momentum {
        let (st, ct) = theta.sin_cos();
        let (sp, cp) = phi.sin_cos();
        Momentum::from_px_py_pz_e(p * st * cp, p * st * sp, p * ct, e)
    }

    /// Build a momentum from its transverse components, rapidity and mass.
    pub fn from_px_py_y_m(px: f64, py: f64, rapidity: f64, m: f64) -> Momentum {
        let et = px.hypot(py).hypot(m);
        Momentum::from_px_py_pz_e(px, py, et * rapidity.sinh(), et * rapidity.cosh())
    }

    #[inline]
    fn compute_p(&mut self) {
        self.p = self.px.hypot(self.py).hypot(self.pz);
    }

    #[inline]
    pub fn px(&self) -> f64 {
        self.px
    }

    #[inline]
    pub fn py(&self) -> f64 {
        self.py
    }

    #[inline]
    pub fn pz(&self) -> f64 {
        self.pz
    }

    #[inline]
    pub fn energy(&self) -> f64 {
        self.e
    }

    /// Norm of the three-momentum.
    #[inline]
    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn set_px(&mut self, px: f64) {
        self.px = px;
        self.compute_p();
    }

    pub fn set_py(&mut self, py: f64) {
        self.py = py;
        self.compute_p();
    }

    pub fn set_pz(&mut self, pz: f64) {
        self.pz = pz;
        self.compute_p();
    }

    pub fn set_energy(&mut self, e: f64) {
        self.e = e;
    }

    pub fn set_p(&mut self, px: f64, py: f64, pz: f64) {
        self.px = px;
        self.py = py;
        self.pz = pz;
        self.compute_p();
    }

    /// Recompute the energy so that the momentum is on its mass shell.
    pub fn set_mass2(&mut self, m2: f64) {
        self.e = (self.p * self.p + m2).sqrt();
    }

    pub fn set_mass(&mut self, m: f64) {
        self.set_mass2(m * m);
    }

    pub fn pt2(&self) -> f64 {
        self.px * self.px + self.py * self.py
    }

    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    pub fn mass2(&self) -> f64 {
        self.e * self.e - self.p * self.p
    }

    /// Signed invariant mass: negative for space-like momenta.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 >= 0. {
            m2.sqrt()
        } else {
            -(-m2).sqrt()
        }
    }

    pub fn theta(&self) -> f64 {
        self.pt().atan2(self.pz)
    }

    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        let sign = if self.pz >= 0. { 1. } else { -1. };
        if pt != 0. {
            sign * ((self.p + self.pz.abs()) / pt).ln()
        } else {
            sign * 9999.
        }
    }

    pub fn rapidity(&self) -> f64 {
        let sign = if self.pz >= 0. { 1. } else { -1. };
        if self.e >= 0. {
            0.5 * ((self.e + self.pz) / (self.e - self.pz)).ln()
        } else {
            sign * 999.
        }
    }

    pub fn beta(&self) -> f64 {
        if self.e == 0. {
            0.
        } else {
            self.p / self.e
        }
    }

    pub fn three_product(&self, other: &Momentum) -> f64 {
        self.px * other.px + self.py * other.py + self.pz * other.pz
    }

    pub fn four_product(&self, other: &Momentum) -> f64 {
        self.e * other.e - self.three_product(other)
    }

    /// The `z` component of the cross product of the transverse parts.
    pub fn cross_product(&self, other: &Momentum) -> f64 {
        self.px * other.py - self.py * other.px
    }

    /// Set to zero all components whose magnitude is below `tolerance`.
    pub fn truncate(&mut self, tolerance: f64) {
        for c in [&mut self.px, &mut self.py, &mut self.pz, &mut self.e] {
            if c.abs() <= tolerance {
                *c = 0.;
            }
        }
        self.compute_p();
    }

    /// Longitudinal boost with Lorentz factor `gamma` and `beta * gamma`.
    pub fn beta_gamma_boost(&mut self, gamma: f64, beta_gamma: f64) -> &mut Momentum {
        if gamma == 1. && beta_gamma == 0. {
            return self;
        }

        let pz = gamma * self.pz + beta_gamma * self.e;
        let e = gamma * self.e + beta_gamma * self.pz;
        self.pz = pz;
        self.e = e;
        self.compute_p();
        self
    }

    /// Boost from the rest frame of `frame` into the frame where `frame` is measured.
    pub fn lorentz_boost(&mut self, frame: &Momentum) -> &mut Momentum {
        if frame.p == 0. {
            return self;
        }

        let m = frame.mass();
        let pf4 = (self.three_product(frame) + self.e * frame.e) / m;
        let factor = (pf4 + self.e) / (frame.e + m);
        self.px += factor * frame.px;
        self.py += factor * frame.py;
        self.pz += factor * frame.pz;
        self.e = pf4;
        self.compute_p();
        self
    }

    /// Rotate by `phi` around the beam axis, optionally reflecting `y` when `sign` is negative.
    pub fn rotate_phi(&mut self, phi: f64, sign: f64) -> &mut Momentum {
        let (s, c) = phi.sin_cos();
        let px = self.px * c + sign * self.py * s;
        let py = -self.px * s + sign * self.py * c;
        self.px = px;
        self.py = py;
        self.compute_p();
        self
    }

    pub fn rotate_theta_phi(&mut self, theta: f64, phi: f64) -> &mut Momentum {
        let (st, ct) = theta.sin_cos();
        let (sp, cp) = phi.sin_cos();
        let rot = [
            [-sp, -ct * cp, st * cp],
            [cp, -ct * sp, st * sp],
            [0., st, ct],
        ];
        let v = [self.px, self.py, self.pz];
        let mut out = [0.; 3];
        for (o, row) in out.iter_mut().zip(&rot) {
            *o = row[0] * v[0] + row[1] * v[1] + row[2] * v[2];
        }
        self.set_p(out[0], out[1], out[2]);
        self
    }

    pub fn mirror_x(&mut self) -> &mut Momentum {
        self.px = -self.px;
        self
    }

    pub fn mirror_z(&mut self) -> &mut Momentum {
        self.pz = -self.pz;
        self
    }

    /// Centre-of-mass energy of a two-particle system.
    pub fn cm_energy(m1: &Momentum, m2: &Momentum) -> f64 {
        if m1.mass() * m2.mass() < 0. || m1.energy() * m2.energy() < 0. {
            return 0.;
        }
        (m1.mass2() + m2.mass2() + 2. * m1.four_product(m2)).sqrt()
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({:.6e}, {:.6e}, {:.6e}; {:.6e})",
            self.px, self.py, self.pz, self.e
        )
    }
}

impl Add for Momentum {
    type Output = Momentum;

    fn add(self, other: Momentum) -> Momentum {
        Momentum::from_px_py_pz_e(
            self.px + other.px,
            self.py + other.py,
            self.pz + other.pz,
            self.e + other.e,
        )
    }
}

impl<'a> Add<&'a Momentum> for &'a Momentum {
    type Output = Momentum;

    fn add(self, other: &'a Momentum) -> Momentum {
        *self + *other
    }
}

impl AddAssign for Momentum {
    fn add_assign(&mut self, other: Momentum) {
        *self = *self + other;
    }
}

impl Sub for Momentum {
    type Output = Momentum;

    fn sub(self, other: Momentum) -> Momentum {
        Momentum::from_px_py_pz_e(
            self.px - other.px,
            self.py - other.py,
            self.pz - other.pz,
            self.e - other.e,
        )
    }
}

impl<'a> Sub<&'a Momentum> for &'a Momentum {
    type Output = Momentum;

    fn sub(self, other: &'a Momentum) -> Momentum {
        *self - *other
    }
}

impl SubAssign for Momentum {
    fn sub_assign(&mut self, other: Momentum) {
        *self = *self - other;
    }
}

/// Spatial inversion: the energy is left untouched.
impl Neg for Momentum {
    type Output = Momentum;

    fn neg(self) -> Momentum {
        Momentum::from_px_py_pz_e(-self.px, -self.py, -self.pz, self.e)
    }
}

impl Mul<f64> for Momentum {
    type Output = Momentum;

    fn mul(self, other: f64) -> Momentum {
        Momentum::from_px_py_pz_e(
            self.px * other,
            self.py * other,
            self.pz * other,
            self.e * other,
        )
    }
}

impl Index<usize> for Momentum {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        match index {
            0 => &self.px,
            1 => &self.py,
            2 => &self.pz,
            3 => &self.e,
            _ => panic!("Index is not between 0 and 3"),
        }
    }
}
