//! Invariants of the `A B -> X (gamma gamma -> l+ l-) Y` phase space.
//!
//! The secondary invariants `s1 = (p4 + p5)^2`, `s2 = (p3 + p4)^2` and the
//! momentum transfers `t1 = (p1 - p3)^2`, `t2 = (p2 - p5)^2` are generated
//! inside the boundaries set by the Källén functions of the two-body
//! splittings, following Vermaseren, Nucl. Phys. B229 (1983) 347.

use crate::accept;
use crate::kinematics::{map_power_law, map_triangle, Masses, PhaseSpace, Rejection};
use crate::limits::Limits;
use crate::utils::kallen;
use std::f64::consts::PI;

/// Strategy used to generate `s2`.
///
/// `0` maps `s2` before `t1`; `±1` uses the Källén-edge mapping and
/// `< -1` or `> 1` the power-law mapping, after (`> 0`) or before
/// (`< 0`) the `t2` generation.
pub type Optimisation = i32;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Invariants {
    pub s: f64,
    pub s1: f64,
    pub s2: f64,
    pub t1: f64,
    pub t2: f64,
    pub w4: f64,
    pub mc4: f64,
    /// Phase-space Jacobian of the `(t1, t2, s2, cos θ4)` generation.
    pub jacobian: f64,
    /// `sqrt(λ(s, m_A², m_B²))`
    pub sl1: f64,
    pub gram: f64,
    pub delta: f64,
    pub dd1: f64,
    pub dd2: f64,
    pub dd3: f64,
    pub dd4: f64,
    pub dd5: f64,
    pub sa1: f64,
    pub sa2: f64,
    pub g4: f64,
    pub p12: f64,
    pub p13: f64,
    pub p14: f64,
    pub p25: f64,
    pub p1k2: f64,
    pub p2k1: f64,
}

/// Generate the invariants for the draws `x = (x_t1, x_t2, x_s2, x_θ4)`
/// at squared centre-of-mass energy `s` and central-system mass `mc4`.
///
/// `q2` restricts the virtuality `-t1` of the first photon.
pub fn pickin(
    s: f64,
    m: &Masses,
    mc4: f64,
    x: &[f64; 4],
    q2: &Limits,
    n_opt: Optimisation,
) -> PhaseSpace<Invariants> {
    let w4 = mc4 * mc4;
    let sig = mc4 + m.my;
    let mut sig1 = sig * sig;
    let mut sig2 = sig1;
    let d6 = w4 - m.my2;
    let ss = s + m.w12;

    let rl1 = kallen(s, m.w1, m.w2);
    if rl1 <= 0. {
        return PhaseSpace::Rejected(Rejection::NonPositive("rl1", rl1));
    }
    let sl1 = rl1.sqrt();

    let mut s2 = 0.;
    let mut ds2 = 0.;
    if n_opt == 0 {
        let smax = s + m.mx2 - 2. * m.mx * s.sqrt();
        let (v, d) = accept!(map_power_law(x[2], sig1, smax, "s2"));
        s2 = v;
        ds2 = d;
        sig1 = s2;
    }

    let sp = s + m.mx2 - sig1;
    let d3 = sig1 - m.w2;
    let rl2 = kallen(s, m.mx2, sig1);
    if rl2 <= 0. {
        return PhaseSpace::Rejected(Rejection::NonPositive("rl2", rl2));
    }
    let sl2 = rl2.sqrt();

    let mut t1_max = m.w1 + m.mx2 - (ss * sp + sl1 * sl2) / (2. * s);
    let mut t1_min = (m.w31 * d3 + (d3 - m.w31) * (d3 * m.w1 - m.w31 * m.w2) / s) / t1_max;

    // restrict t1 to the virtuality cut
    if let Some(q2_min) = q2.min() {
        t1_max = t1_max.min(-q2_min);
    }
    if let Some(q2_max) = q2.max() {
        t1_min = t1_min.max(-q2_max);
    }
    if t1_min > t1_max {
        return PhaseSpace::Rejected(Rejection::MomentumTransferCut);
    }

    let (t1, dt1) = accept!(map_power_law(x[0], t1_min, t1_max, "t1"));
    let dt1 = -dt1;

    let dd4_0 = w4 - t1;
    let d8 = t1 - m.w2;
    let t13 = t1 - m.w1 - m.mx2;

    let sa1 = -(t1 - m.w31).powi(2) / 4. + m.w1 * t1;
    if sa1 >= 0. {
        return PhaseSpace::Rejected(Rejection::NonNegative("sa1", sa1));
    }
    let sl3 = (-sa1).sqrt();

    let (splus, s2_max) = if m.w1 != 0. {
        let sb = m.mx2 + 0.5 * (s * (t1 - m.w31) + m.w12 * t13) / m.w1;
        let sd = sl1 * sl3 / m.w1;
        let se = (s * (t1 * (s + t13 - m.w2) - m.w2 * m.w31)
            + m.mx2 * (m.w12 * d8 + m.w2 * m.mx2))
            / m.w1;
        if ((sb - sd) / sd).abs() >= 1. {
            let splus = sb - sd;
            (splus, se / splus)
        } else {
            let s2_max = sb + sd;
            (se / s2_max, s2_max)
        }
    } else {
        let s2_max = (s * (t1 * (s + d8 - m.mx2) - m.w2 * m.mx2)
            + m.w2 * m.mx2 * (m.w2 + m.mx2 - t1))
            / (ss * t13);
        (sig2, s2_max)
    };

    let mut s2x = s2_max;
    if n_opt < 0 {
        if splus > sig2 {
            sig2 = splus;
        }
        let (v, d) = if n_opt < -1 {
            accept!(map_power_law(x[2], sig2, s2_max, "s2"))
        } else {
            accept!(map_triangle(t1, m.w2, x[2], sig2, s2_max, "s2"))
        };
        s2 = v;
        ds2 = d;
        s2x = s2;
    } else if n_opt == 0 {
        s2x = s2;
    }

    let rl4 = kallen(s2x, t1, m.w2) * kallen(s2x, w4, m.my2);
    if rl4 <= 0. {
        return PhaseSpace::Rejected(Rejection::NonPositive("rl4", rl4));
    }
    let sl4 = rl4.sqrt();
    let r1 = s2x - d8;
    let r2 = s2x - d6;

    let t2_max = m.w2 + m.my2 - (r1 * r2 + sl4) / s2x * 0.5;
    let t2_min =
        (m.w52 * dd4_0 + (dd4_0 - m.w52) * (dd4_0 * m.w2 - m.w52 * t1) / s2x) / t2_max;

    let (t2, dt2) = accept!(map_power_law(x[1], t2_min, t2_max, "t2"));
    let dt2 = -dt2;

    let tau = t1 - t2;
    let r3 = dd4_0 - t2;
    let r4 = m.w52 - t2;

    let b = r3 * r4 - 2. * (t1 + m.w2) * t2;
    let c = t2 * d6 * d8 + (d6 - d8) * (d6 * m.w2 - d8 * m.my2);
    let t25 = t2 - m.w2 - m.my2;

    let sa2 = -0.25 * r4 * r4 + m.w2 * t2;
    if sa2 >= 0. {
        return PhaseSpace::Rejected(Rejection::NonNegative("sa2", sa2));
    }
    let sl6 = 2. * (-sa2).sqrt();

    let g4 = -r3 * r3 / 4. + t1 * t2;
    if g4 >= 0. {
        return PhaseSpace::Rejected(Rejection::NonNegative("g4", g4));
    }
    let sl7 = 2. * (-g4).sqrt();
    let sl5 = sl6 * sl7;

    let (s2p, s2_min) = if ((sl5 - b) / sl5).abs() >= 1. {
        let s2p = 0.5 * (sl5 - b) / t2;
        (s2p, c / (t2 * s2p))
    } else {
        let s2_min = 0.5 * (-sl5 - b) / t2;
        (c / (t2 * s2_min), s2_min)
    };

    if n_opt >= 1 {
        let (v, d) = if n_opt > 1 {
            accept!(map_power_law(x[2], s2_min, s2_max, "s2"))
        } else {
            accept!(map_triangle(t1, m.w2, x[2], s2_min, s2_max, "s2"))
        };
        s2 = v;
        ds2 = d;
    }

    let ap = -0.25 * (s2 + d8).powi(2) + s2 * t1;

    let dd1 = if m.w1 != 0. {
        0.25 * (s2 - s2_max) * (splus - s2) * m.w1
    } else {
        0.25 * (s2 - s2_max) * ss * t13
    };
    let dd2 = 0.25 * (s2 - s2_min) * (s2p - s2) * t2;

    let yy4 = (PI * x[3]).cos();
    let dd = dd1 * dd2;
    let p12 = 0.5 * (s - m.w1 - m.w2);
    let st = s2 - t1 - m.w2;
    let delb = (2. * m.w2 * r3 + r4 * st) * (4. * p12 * t1 - (t1 - m.w31) * st) / (16. * ap);

    if dd <= 0. {
        return PhaseSpace::Rejected(Rejection::NonPositive("dd", dd));
    }
    if ap >= 0. {
        return PhaseSpace::Rejected(Rejection::NonNegative("ap", ap));
    }

    let delta = delb - yy4 * st * dd.sqrt() / ap * 0.5;
    let s1 = t2 + m.w1 + (2. * p12 * r3 - 4. * delta) / st;

    let jacobian = ds2 * dt1 * dt2 * 0.125 * PI * PI / (sl1 * (-ap).sqrt());
    if !(jacobian > 0.) || !jacobian.is_finite() {
        return PhaseSpace::Rejected(Rejection::NonPositive("jacobian", jacobian));
    }

    let gram = (1. - yy4 * yy4) * dd / ap;

    let p13 = -0.5 * t13;
    let p14 = 0.5 * (tau + s1 - m.mx2);
    let p25 = -0.5 * t25;
    let p1k2 = 0.5 * (s1 - t2 - m.w1);
    let p2k1 = 0.5 * st;

    let dd3 = if m.w2 != 0. {
        let sbb = 0.5 * (s * (t2 - m.w52) - m.w12 * t25) / m.w2 + m.my2;
        let sdd = 0.5 * sl1 * sl6 / m.w2;
        let see = (s * (t2 * (s + t25 - m.w1) - m.w1 * m.w52)
            + m.my2 * (m.w1 * m.my2 - m.w12 * (t2 - m.w1)))
            / m.w2;
        let (s1p, s1m) = if sbb / sdd >= 0. {
            let s1p = sbb + sdd;
            (s1p, see / s1p)
        } else {
            let s1m = sbb - sdd;
            (see / s1m, s1m)
        };
        -0.25 * m.w2 * (s1p - s1) * (s1m - s1)
    } else {
        let s1p = (s * (t2 * (s - m.my2 + t2 - m.w1) - m.w1 * m.my2)
            + m.w1 * m.my2 * (m.w1 + m.my2 - t2))
            / (t25 * (s - m.w12));
        -0.25 * t25 * (s - m.w12) * (s1p - s1)
    };

    let ssb = t2 + 0.5 * m.w1 - r3 * (m.w31 - t1) / t1;
    let ssd = sl3 * sl7 / t1;
    let sse = (t2 - m.w1) * (w4 - m.mx2)
        + (t2 - w4 + m.w31) * ((t2 - m.w1) * m.mx2 - (w4 - m.mx2) * m.w1) / t1;
    let (s1pp, s1pm) = if ssb / ssd >= 0. {
        let s1pp = ssb + ssd;
        (s1pp, sse / s1pp)
    } else {
        let s1pm = ssb - ssd;
        (sse / s1pm, s1pm)
    };
    let dd4 = -0.25 * t1 * (s1 - s1pp) * (s1 - s1pm);

    let dd5 = dd1
        + dd3
        + ((p12 * (t1 - m.w31) * 0.5 - m.w1 * p2k1) * (p2k1 * (t2 - m.w52) - m.w2 * r3)
            - delta * (2. * p12 * p2k1 - m.w2 * (t1 - m.w31)))
            / p2k1;

    PhaseSpace::Accepted(Invariants {
        s,
        s1,
        s2,
        t1,
        t2,
        w4,
        mc4,
        jacobian,
        sl1,
        gram,
        delta,
        dd1,
        dd2,
        dd3,
        dd4,
        dd5,
        sa1,
        sa2,
        g4,
        p12,
        p13,
        p14,
        p25,
        p1k2,
        p2k1,
    })
}
