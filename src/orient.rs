use crate::kinematics::{Masses, PhaseSpace, Rejection};
use crate::pickin::Invariants;
use vector::Momentum;

/// Centre-of-mass frame kinematics of the two outgoing beam legs and of
/// the central system, derived from a set of [`Invariants`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Frame {
    pub ep1: f64,
    pub ep2: f64,
    /// Momentum of the incoming particles in the centre-of-mass frame.
    pub p_cm: f64,
    pub de3: f64,
    pub de5: f64,
    /// Energy, momentum and transverse momentum of the central system.
    pub ec4: f64,
    pub pc4: f64,
    pub pt4: f64,
    pub sin_theta4: f64,
    pub cos_theta4: f64,
    pub al4: f64,
    pub be4: f64,
    pub p3: Momentum,
    pub p5: Momentum,
}

impl Frame {
    pub fn p1(&self) -> Momentum {
        Momentum::from_px_py_pz_e(0., 0., self.p_cm, self.ep1)
    }

    pub fn p2(&self) -> Momentum {
        Momentum::from_px_py_pz_e(0., 0., -self.p_cm, self.ep2)
    }

    /// Momentum of the central system; lies in the `xz` plane.
    pub fn p4(&self) -> Momentum {
        Momentum::from_px_py_pz_e(self.pt4, 0., self.pc4 * self.cos_theta4, self.ec4)
    }
}

/// Build the outgoing momenta in the centre-of-mass frame, with the
/// incoming particle `A` along `+z`.
pub fn orient(inv: &Invariants, m: &Masses) -> PhaseSpace<Frame> {
    let s = inv.s;
    let re = 0.5 / s.sqrt();
    let ep1 = re * (s + m.w12);
    let ep2 = re * (s - m.w12);
    let p_cm = re * inv.sl1;

    let de3 = re * (inv.s2 - m.mx2 + m.w12);
    let de5 = re * (inv.s1 - m.my2 - m.w12);

    let ep3 = ep1 - de3;
    let ep5 = ep2 - de5;
    let ec4 = de3 + de5;

    if ec4 < inv.mc4 {
        return PhaseSpace::Rejected(Rejection::NonPositive("ec4 - mc4", ec4 - inv.mc4));
    }
    let pc4 = (ec4 * ec4 - inv.mc4 * inv.mc4).sqrt();
    if pc4 == 0. {
        return PhaseSpace::Rejected(Rejection::NonPositive("pc4", pc4));
    }

    let pp3 = (ep3 * ep3 - m.mx2).sqrt();
    let pt3 = (inv.dd1 / s).sqrt() / p_cm;
    let pp5 = (ep5 * ep5 - m.my2).sqrt();
    let pt5 = (inv.dd3 / s).sqrt() / p_cm;

    let sin_theta3 = pt3 / pp3;
    let sin_theta5 = pt5 / pp5;
    // NaN compares false: reject it along with out-of-range values
    if !(sin_theta3 <= 1.) {
        return PhaseSpace::Rejected(Rejection::Angle("sin(theta3)", sin_theta3));
    }
    if !(sin_theta5 <= 1.) {
        return PhaseSpace::Rejected(Rejection::Angle("sin(theta5)", sin_theta5));
    }

    let ct3 = if ep1 * ep3 < inv.p13 { -1. } else { 1. } * (1. - sin_theta3 * sin_theta3).sqrt();
    let ct5 = if ep2 * ep5 > inv.p25 { -1. } else { 1. } * (1. - sin_theta5 * sin_theta5).sqrt();

    if inv.dd5 < 0. {
        return PhaseSpace::Rejected(Rejection::NonPositive("dd5", inv.dd5));
    }

    let pt4 = (inv.dd5 / s).sqrt() / p_cm;
    let sin_theta4 = pt4 / pc4;
    if !(sin_theta4 <= 1.) {
        return PhaseSpace::Rejected(Rejection::Angle("sin(theta4)", sin_theta4));
    }

    let mut cos_theta4 = (1. - sin_theta4 * sin_theta4).sqrt();
    if ep1 * ec4 < inv.p14 {
        cos_theta4 = -cos_theta4;
    }

    let mut al4 = 1. - cos_theta4;
    let mut be4 = 1. + cos_theta4;
    if cos_theta4 < 0. {
        be4 = sin_theta4 * sin_theta4 / al4;
    } else {
        al4 = sin_theta4 * sin_theta4 / be4;
    }

    let rr = (-inv.gram / s).sqrt() / (p_cm * pt4);
    let sin_phi3 = rr / pt3;
    let sin_phi5 = -rr / pt5;
    if !(sin_phi3.abs() <= 1.) {
        return PhaseSpace::Rejected(Rejection::Angle("sin(phi3)", sin_phi3));
    }
    if !(sin_phi5.abs() <= 1.) {
        return PhaseSpace::Rejected(Rejection::Angle("sin(phi5)", sin_phi5));
    }
    let cos_phi3 = -(1. - sin_phi3 * sin_phi3).sqrt();
    let cos_phi5 = -(1. - sin_phi5 * sin_phi5).sqrt();

    let mut p3 = Momentum::from_px_py_pz_e(
        pp3 * sin_theta3 * cos_phi3,
        pp3 * sin_theta3 * sin_phi3,
        pp3 * ct3,
        ep3,
    );
    let mut p5 = Momentum::from_px_py_pz_e(
        pp5 * sin_theta5 * cos_phi5,
        pp5 * sin_theta5 * sin_phi5,
        pp5 * ct5,
        ep5,
    );

    // both legs recoil against the central system along x: pick the
    // azimuth signs that balance it
    let a1 = p3.px() - p5.px();
    if (pt4 + p3.px() + p5.px()).abs() >= (a1.abs() - pt4).abs() {
        if a1 < 0. {
            p5.mirror_x();
        } else {
            p3.mirror_x();
        }
    }

    PhaseSpace::Accepted(Frame {
        ep1,
        ep2,
        p_cm,
        de3,
        de5,
        ec4,
        pc4,
        pt4,
        sin_theta4,
        cos_theta4,
        al4,
        be4,
        p3,
        p5,
    })
}
