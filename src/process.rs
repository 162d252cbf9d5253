//! The `A B -> X (γγ -> l+ l-) Y` LPAIR process.
//!
//! The weight of a point of the unit hypercube is built in four steps: the
//! remnant masses and the central-system mass are mapped, the invariants
//! are solved for in [`pickin`], the outgoing legs are placed in the
//! centre-of-mass frame by [`orient`] and the lepton pair is built in its
//! rest frame, before the matrix element of Vermaseren is evaluated.

use crate::event::{Event, Role, Status};
use crate::form_factors::{FormFactors, FormFactorsModel};
use crate::kinematics::{map_power_law, Masses, PhaseSpace, Rejection};
use crate::limits::Limits;
use crate::orient::{orient, Frame};
use crate::pdg;
use crate::pickin::{pickin, Invariants, Optimisation};
use crate::{accept, ConfigurationError, CutsSettings, KinematicsSettings, ProcessMode};
use color_eyre::Report;
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::PI;
use vector::Momentum;

/// A physics process: a weight over the unit hypercube and the event of
/// the last evaluated point.
pub trait Process: Send {
    fn name(&self) -> &str;

    fn ndim(&self) -> usize;

    /// Differential cross section in pb at `x`, zero outside the physical region.
    fn weight(&mut self, x: &[f64]) -> f64;

    /// Why the last evaluated point was rejected, if it was.
    fn last_rejection(&self) -> Option<Rejection>;

    /// Build the event of the last accepted point. The random numbers
    /// only drive symmetries of the final state.
    fn event(&self, rng: &mut StdRng) -> Option<Event>;

    fn box_clone(&self) -> Box<dyn Process>;
}

impl Clone for Box<dyn Process> {
    fn clone(&self) -> Box<dyn Process> {
        self.box_clone()
    }
}

/// Kinematics of an accepted point, kept to fill its event.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointKinematics {
    pub invariants: Invariants,
    pub frame: Frame,
    pub mx: f64,
    pub my: f64,
    /// Leptons in the laboratory frame.
    pub p6: Momentum,
    pub p7: Momentum,
    pub weight: f64,
}

/// Intermediate quantities of the lepton-pair construction entering the matrix element.
#[derive(Debug, Copy, Clone, Default)]
struct CentralSystem {
    p6: Momentum,
    p7: Momentum,
    jacobian: f64,
    q1dq: f64,
    q1dq2: f64,
    bb: f64,
    epsi: f64,
    g5: f64,
    g6: f64,
    a5: f64,
    a6: f64,
}

#[derive(Debug, Clone)]
pub struct GamGamLL {
    mode: ProcessMode,
    beam_pdg: (i64, i64),
    pair: i64,
    m_a: f64,
    m_b: f64,
    ml: f64,
    s: f64,
    sqrt_s: f64,
    /// Boost from the centre-of-mass to the laboratory frame.
    gamma: f64,
    beta_gamma: f64,
    cuts: CutsSettings,
    n_opt: Optimisation,
    form_factors: (FormFactorsModel, FormFactorsModel),
    last: Option<PointKinematics>,
    last_rejection: Option<Rejection>,
    debug: usize,
}

impl GamGamLL {
    pub fn new(settings: &KinematicsSettings, debug: usize) -> Result<GamGamLL, Report> {
        let m_a = pdg::mass(settings.beam1.pdg)?;
        let m_b = pdg::mass(settings.beam2.pdg)?;
        if !pdg::is_lepton(settings.pair) {
            return Err(ConfigurationError::InvalidSetting(format!(
                "the central pair must be made of leptons, got PDG id {}",
                settings.pair
            ))
            .into());
        }
        let ml = pdg::mass(settings.pair)?;

        for (dissociates, beam) in &[
            (settings.mode.dissociates_first(), &settings.beam1),
            (settings.mode.dissociates_second(), &settings.beam2),
        ] {
            if *dissociates && beam.pdg != pdg::PROTON {
                return Err(ConfigurationError::InvalidSetting(format!(
                    "mode {} dissociates a beam of {}, only protons can dissociate",
                    settings.mode,
                    pdg::name(beam.pdg)
                ))
                .into());
            }
        }
        if settings.mode.dissociates_any() && !settings.cuts.mx.has_max() {
            return Err(ConfigurationError::MissingRange("mx".to_owned()).into());
        }

        let p1 = Momentum::from_px_py_pz_m(0., 0., settings.beam1.pz.abs(), m_a);
        let p2 = Momentum::from_px_py_pz_m(0., 0., -settings.beam2.pz.abs(), m_b);
        let cm = p1 + p2;
        let s = cm.mass2();
        let sqrt_s = s.sqrt();
        if !(sqrt_s > m_a + m_b + 2. * ml) {
            return Err(ConfigurationError::InvalidSetting(format!(
                "centre-of-mass energy {} GeV is below the production threshold",
                sqrt_s
            ))
            .into());
        }

        let leg_model = |dissociates: bool, pdg_id: i64| {
            if dissociates {
                settings.remnant_form_factors
            } else if pdg_id == pdg::PROTON {
                FormFactorsModel::StandardDipole
            } else {
                FormFactorsModel::Trivial
            }
        };

        Ok(GamGamLL {
            mode: settings.mode,
            beam_pdg: (settings.beam1.pdg, settings.beam2.pdg),
            pair: settings.pair,
            m_a,
            m_b,
            ml,
            s,
            sqrt_s,
            gamma: cm.energy() / sqrt_s,
            beta_gamma: cm.pz() / sqrt_s,
            cuts: settings.cuts.clone(),
            n_opt: settings.n_opt,
            form_factors: (
                leg_model(settings.mode.dissociates_first(), settings.beam1.pdg),
                leg_model(settings.mode.dissociates_second(), settings.beam2.pdg),
            ),
            last: None,
            last_rejection: None,
            debug,
        })
    }

    pub fn sqrt_s(&self) -> f64 {
        self.sqrt_s
    }

    pub fn mode(&self) -> ProcessMode {
        self.mode
    }

    /// Kinematics of the last accepted point.
    pub fn last_point(&self) -> Option<&PointKinematics> {
        self.last.as_ref()
    }

    /// Mass of a dissociated remnant, mapped on `x`, and the Jacobian `d(M²)`.
    /// `m_beam` is the mass of the dissociating beam, `m_other` the one of the other leg.
    fn remnant_mass(&self, x: f64, m_beam: f64, m_other: f64) -> PhaseSpace<(f64, f64)> {
        let mx0 = m_beam + pdg::PI_ZERO_MASS;
        let min = mx0.max(self.cuts.mx.min().unwrap_or(0.));
        let max = (self.sqrt_s - m_other - 2. * self.ml).min(self.cuts.mx.max().unwrap_or(self.sqrt_s));
        if !(min < max) {
            return PhaseSpace::Rejected(Rejection::EmptyRange("mx"));
        }
        let (mx2, dmx2) = accept!(map_power_law(x, min * min, max * max, "mx2"));
        PhaseSpace::Accepted((mx2.sqrt(), dmx2))
    }

    /// Full weight computation for the point `x`.
    pub fn compute(&self, x: &[f64]) -> PhaseSpace<PointKinematics> {
        let mut remnant_jacobian = 1.;
        let (mx, my) = match self.mode {
            ProcessMode::ElasticElastic => (self.m_a, self.m_b),
            ProcessMode::InelasticElastic => {
                let (mx, d) = accept!(self.remnant_mass(x[7], self.m_a, self.m_b));
                remnant_jacobian *= d;
                (mx, self.m_b)
            }
            ProcessMode::ElasticInelastic => {
                let (my, d) = accept!(self.remnant_mass(x[7], self.m_b, self.m_a));
                remnant_jacobian *= d;
                (self.m_a, my)
            }
            ProcessMode::InelasticInelastic => {
                let (mx, dx) = accept!(self.remnant_mass(x[7], self.m_a, self.m_b));
                let (my, dy) = accept!(self.remnant_mass(x[8], self.m_b, self.m_a));
                remnant_jacobian *= dx * dy;
                (mx, my)
            }
        };
        let masses = Masses::new(self.m_a, self.m_b, mx, my, self.ml);

        // two-photon mass squared
        let w_min = self.cuts.w.min().unwrap_or(4. * masses.ml2);
        let w_max = self
            .cuts
            .w
            .max()
            .unwrap_or(self.s)
            .min((self.sqrt_s - mx - my).powi(2));
        if !(w_min < w_max) {
            return PhaseSpace::Rejected(Rejection::EmptyRange("w4"));
        }
        let (w4, dw4) = accept!(map_power_law(x[4], w_min, w_max, "w4"));
        let mc4 = w4.sqrt();

        let inv = accept!(pickin(
            self.s,
            &masses,
            mc4,
            &[x[0], x[1], x[2], x[3]],
            &self.cuts.q2,
            self.n_opt
        ));
        let frame = accept!(orient(&inv, &masses));

        if inv.t1 > 0. {
            return PhaseSpace::Rejected(Rejection::NonNegative("t1", inv.t1));
        }
        if inv.t2 > 0. {
            return PhaseSpace::Rejected(Rejection::NonNegative("t2", inv.t2));
        }

        let central = accept!(self.central_system(&inv, &frame, &masses, x[5], x[6]));
        let mut p6 = central.p6;
        let mut p7 = central.p7;
        p6.beta_gamma_boost(self.gamma, self.beta_gamma);
        p7.beta_gamma_boost(self.gamma, self.beta_gamma);

        accept!(self.apply_cuts(&inv, mx, my, &p6, &p7));

        let mi2 = (masses.w1, masses.w2);
        let fp1 = self.form_factors.0.evaluate(-inv.t1, mi2.0, masses.mx2);
        let fp2 = self.form_factors.1.evaluate(-inv.t2, mi2.1, masses.my2);
        let peripp = peri_pp(&inv, &central, &masses, &fp1, &fp2);

        let jacobian = inv.jacobian * dw4 * central.jacobian;
        let weight = pdg::GEV2_TO_PB * jacobian * peripp * remnant_jacobian;

        PhaseSpace::Accepted(PointKinematics {
            invariants: inv,
            frame,
            mx,
            my,
            p6,
            p7,
            weight,
        })
    }

    /// Build the lepton pair from its rest-frame angles `(x_θ6, x_φ6)` and
    /// the photon kinematics.
    fn central_system(
        &self,
        inv: &Invariants,
        fr: &Frame,
        m: &Masses,
        x_theta: f64,
        x_phi: f64,
    ) -> PhaseSpace<CentralSystem> {
        let (w4, mc4, t1, t2) = (inv.w4, inv.mc4, inv.t1, inv.t2);
        let (ct4, st4) = (fr.cos_theta4, fr.sin_theta4);
        let p3 = &fr.p3;
        let p5 = &fr.p5;

        let ecm6 = w4 / (2. * mc4);
        let pp6cm = (ecm6 * ecm6 - m.ml2).sqrt();
        let mut jacobian = pp6cm / (mc4 * pdg::SCONSTB * self.s);

        let e1mp1 = m.w1 / (fr.ep1 + fr.p_cm);
        let e3mp3 = m.mx2 / (p3.energy() + p3.p());
        let theta3 = p3.theta();
        // the LPAIR denominator is 1 + θ3, not 1 + cos θ3
        let al3 = theta3.sin().powi(2) / (1. + theta3);

        // direction of the first photon in the pair rest frame
        let eg = (w4 + t1 - t2) / (2. * mc4);
        let mut pg = (eg * eg - t1).sqrt();

        let pgx = -p3.px() * ct4 - st4 * (fr.de3 - e1mp1 + e3mp3 + p3.p() * al3);
        let pgy = -p3.py();
        let pgz = mc4 * fr.de3 / (fr.ec4 + fr.pc4) - fr.ec4 * fr.de3 * fr.al4 / mc4
            - p3.px() * fr.ec4 * st4 / mc4
            + fr.ec4 * ct4 / mc4 * (p3.p() * al3 + e3mp3 - e1mp1);

        let pgp = pgx.hypot(pgy);
        let pgg = pgp.hypot(pgz);
        if pgg > pgp * 0.9 && pgg > pg {
            pg = pgg;
        }
        if !(pgp > 0.) {
            return PhaseSpace::Rejected(Rejection::NonPositive("pgp", pgp));
        }

        let (cpg, spg) = (pgx / pgp, pgy / pgp);
        let stg = pgp / pg;
        if !(stg <= 1.) {
            return PhaseSpace::Rejected(Rejection::Angle("sin(theta_g)", stg));
        }
        let ctg = pgz.signum() * (1. - stg * stg).sqrt();

        // polar angle of the lepton, concentrated along the photon axis
        let amap = 0.5 * (w4 - t1 - t2);
        let bmap = 0.5 * (((w4 - t1 - t2).powi(2) - 4. * t1 * t2) * (1. - 4. * m.ml2 / w4)).sqrt();
        let ymap = (amap + bmap) / (amap - bmap);
        let beta = ymap.powf(2. * x_theta - 1.);
        let xx6 = (0.5 * (1. + amap / bmap * (beta - 1.) / (beta + 1.))).max(0.).min(1.);

        let theta6cm = (1. - 2. * xx6).acos();
        let ct6 = theta6cm.cos();
        jacobian *= (amap + bmap * ct6) * (amap - bmap * ct6) / amap / bmap * ymap.ln() * 0.5;
        if !(jacobian > 0.) || !jacobian.is_finite() {
            return PhaseSpace::Rejected(Rejection::NonPositive("central jacobian", jacobian));
        }

        let phi6cm = 2. * PI * x_phi;
        let p6cm = Momentum::from_p_theta_phi(pp6cm, theta6cm, phi6cm, ecm6);

        let h1 = stg * p6cm.pz() + ctg * p6cm.px();
        let pc6z = ctg * p6cm.pz() - stg * p6cm.px();
        let pc6x = cpg * h1 - spg * p6cm.py();
        let (qcx, qcz) = (2. * pc6x, 2. * pc6z);

        let el6 = (fr.ec4 * ecm6 + fr.pc4 * pc6z) / mc4;
        let h2 = (fr.ec4 * pc6z + fr.pc4 * ecm6) / mc4;

        let p6x = ct4 * pc6x + st4 * h2;
        let p6y = cpg * p6cm.py() + spg * h1;
        let p6z = ct4 * h2 - st4 * pc6x;
        let p6 = Momentum::from_px_py_pz_e(p6x, p6y, p6z, el6);

        let hq = fr.ec4 * qcz / mc4;
        let qve = Momentum::from_px_py_pz_e(
            ct4 * qcx + st4 * hq,
            2. * p6y,
            ct4 * hq - st4 * qcx,
            fr.pc4 * qcz / mc4,
        );

        let p7 = Momentum::from_px_py_pz_e(
            fr.pt4 - p6x,
            -p6y,
            fr.pc4 * ct4 - p6z,
            fr.ec4 - el6,
        );

        let q1dq = eg * (2. * ecm6 - mc4) - 2. * pg * p6cm.pz();
        let q1dq2 = 0.5 * (w4 - t1 - t2);

        let (sphi3, cphi3) = p3.phi().sin_cos();
        let (sphi5, cphi5) = p5.phi().sin_cos();
        let (pt3, pt5) = (p3.pt(), p5.pt());

        let bb = t1 * t2
            + (w4 * theta6cm.sin().powi(2) + 4. * m.ml2 * ct6 * ct6) * pg * pg;

        let (ep1, ep2, p_cm) = (fr.ep1, fr.ep2, fr.p_cm);
        let c1 = pt3 * (qve.px() * sphi3 - qve.py() * cphi3);
        let c2 = pt3 * (qve.pz() * ep1 - qve.energy() * p_cm);
        let c3 = (m.w31 * ep1 * ep1 + 2. * m.w1 * fr.de3 * ep1 - m.w1 * fr.de3 * fr.de3
            + p3.pt2() * ep1 * ep1)
            / (p3.energy() * p_cm + p3.pz() * ep1);

        let b1 = pt5 * (qve.px() * sphi5 - qve.py() * cphi5);
        let b2 = pt5 * (qve.pz() * ep2 + qve.energy() * p_cm);
        let b3 = (m.w52 * ep2 * ep2 + 2. * m.w2 * fr.de5 * ep2 - m.w2 * fr.de5 * fr.de5
            + p5.pt2() * ep2 * ep2)
            / (ep2 * p5.pz() - p5.energy() * p_cm);

        let r12 = c2 * sphi3 + qve.py() * c3;
        let r13 = -c2 * cphi3 - qve.px() * c3;
        let r22 = b2 * sphi5 + qve.py() * b3;
        let r23 = -b2 * cphi5 - qve.px() * b3;

        let epsi = inv.p12 * c1 * b1 + r12 * r22 + r13 * r23;
        let g5 = m.w1 * c1 * c1 + r12 * r12 + r13 * r13;
        let g6 = m.w2 * b1 * b1 + r22 * r22 + r23 * r23;

        let cos_phi35 = cphi3 * cphi5 + sphi3 * sphi5;
        let a5 = -(qve.px() * cphi3 + qve.py() * sphi3) * pt3 * inv.p1k2
            - (ep1 * qve.energy() - p_cm * qve.pz()) * cos_phi35 * pt3 * pt5
            + (fr.de5 * qve.pz() + qve.energy() * (p_cm + p5.pz())) * c3;
        let a6 = -(qve.px() * cphi5 + qve.py() * sphi5) * pt5 * inv.p2k1
            - (ep2 * qve.energy() + p_cm * qve.pz()) * cos_phi35 * pt3 * pt5
            + (fr.de3 * qve.pz() - qve.energy() * (p_cm - p3.pz())) * b3;

        PhaseSpace::Accepted(CentralSystem {
            p6,
            p7,
            jacobian,
            q1dq,
            q1dq2,
            bb,
            epsi,
            g5,
            g6,
            a5,
            a6,
        })
    }

    fn apply_cuts(
        &self,
        inv: &Invariants,
        mx: f64,
        my: f64,
        p6: &Momentum,
        p7: &Momentum,
    ) -> PhaseSpace<()> {
        let c = &self.cuts;
        if c.mx.is_valid() {
            if self.mode.dissociates_first() && !c.mx.contains(mx) {
                return PhaseSpace::Rejected(Rejection::Cut("mx"));
            }
            if self.mode.dissociates_second() && !c.mx.contains(my) {
                return PhaseSpace::Rejected(Rejection::Cut("my"));
            }
        }

        if !c.q2.contains(-inv.t1) {
            return PhaseSpace::Rejected(Rejection::Cut("q2"));
        }
        if !c.mass_sum.contains((*p6 + *p7).mass()) {
            return PhaseSpace::Rejected(Rejection::Cut("mass_sum"));
        }

        let single: [(&Limits, fn(&Momentum) -> f64, &'static str); 3] = [
            (&c.pt_single, Momentum::pt, "pt_single"),
            (&c.energy_single, Momentum::energy, "energy_single"),
            (&c.eta_single, Momentum::eta, "eta_single"),
        ];
        for &(limits, var, name) in &single {
            if limits.is_valid() && (!limits.contains(var(p6)) || !limits.contains(var(p7))) {
                return PhaseSpace::Rejected(Rejection::Cut(name));
            }
        }
        PhaseSpace::Accepted(())
    }
}

/// Vermaseren's `γγ -> l+ l-` matrix element contracted with the two
/// photon vertices.
fn peri_pp(
    inv: &Invariants,
    c: &CentralSystem,
    m: &Masses,
    fp1: &FormFactors,
    fp2: &FormFactors,
) -> f64 {
    let (t1, t2) = (inv.t1, inv.t2);
    let ml2 = m.ml2;
    let qqq = c.q1dq * c.q1dq;
    let qdq = 4. * ml2 - inv.w4;

    // magnetic-magnetic
    let t11 = 64.
        * (c.bb * (qqq - inv.g4 - qdq * (t1 + t2 + 2. * ml2))
            - 2. * (t1 + 2. * ml2) * (t2 + 2. * ml2) * qqq)
        * t1
        * t2;
    // electric-magnetic
    let t12 = 128. * (-c.bb * (inv.dd2 + c.g6) - 2. * (t1 + 2. * ml2) * (inv.sa2 * qqq + c.a6 * c.a6)) * t1;
    // magnetic-electric
    let t21 = 128. * (-c.bb * (inv.dd4 + c.g5) - 2. * (t2 + 2. * ml2) * (inv.sa1 * qqq + c.a5 * c.a5)) * t2;
    // electric-electric
    let t22 = 512.
        * (c.bb * (inv.delta * inv.delta - inv.gram)
            - (c.epsi - inv.delta * (qdq + c.q1dq2)).powi(2)
            - inv.sa1 * c.a6 * c.a6
            - inv.sa2 * c.a5 * c.a5
            - inv.sa1 * inv.sa2 * qqq);

    (fp1.fm * fp2.fm * t11 + fp1.fe * fp2.fm * t21 + fp1.fm * fp2.fe * t12 + fp1.fe * fp2.fe * t22)
        / (2. * t1 * t2 * c.bb).powi(2)
}

impl Process for GamGamLL {
    fn name(&self) -> &str {
        "lpair"
    }

    fn ndim(&self) -> usize {
        self.mode.ndim()
    }

    fn weight(&mut self, x: &[f64]) -> f64 {
        match self.compute(x) {
            PhaseSpace::Accepted(k) => {
                let w = k.weight;
                self.last = Some(k);
                self.last_rejection = None;
                w
            }
            PhaseSpace::Rejected(r) => {
                if self.debug > 2 {
                    println!("Point {:?} rejected: {}", x, r);
                }
                self.last = None;
                self.last_rejection = Some(r);
                0.
            }
        }
    }

    fn last_rejection(&self) -> Option<Rejection> {
        self.last_rejection
    }

    fn event(&self, rng: &mut StdRng) -> Option<Event> {
        let k = self.last.as_ref()?;
        let fr = &k.frame;

        let mut ip1 = fr.p1();
        let mut ip2 = fr.p2();
        let mut p3 = fr.p3;
        let mut p5 = fr.p5;
        for p in [&mut ip1, &mut ip2, &mut p3, &mut p5] {
            p.beta_gamma_boost(self.gamma, self.beta_gamma);
        }
        let mut p6 = k.p6;
        let mut p7 = k.p7;

        // random azimuthal orientation of the whole final state
        let rany = if rng.gen::<bool>() { 1. } else { -1. };
        let ransign: i8 = if rng.gen::<bool>() { 1 } else { -1 };
        let ranphi = rng.gen::<f64>() * 2. * PI;

        let mut ph1 = ip1 - p3;
        let mut ph2 = ip2 - p5;
        for p in [&mut ph1, &mut ph2, &mut p3, &mut p5, &mut p6, &mut p7] {
            p.rotate_phi(ranphi, rany);
        }

        let remnant_status = |dissociates: bool| {
            if dissociates {
                Status::Unfragmented
            } else {
                Status::FinalState
            }
        };

        let mut ev = Event::default();
        let b1 = ev.add(Role::IncomingBeam1, self.beam_pdg.0, Status::Incoming, ip1, &[]);
        let b2 = ev.add(Role::IncomingBeam2, self.beam_pdg.1, Status::Incoming, ip2, &[]);
        let g1 = ev.add(Role::Parton1, pdg::PHOTON, Status::Propagator, ph1, &[b1]);
        let g2 = ev.add(Role::Parton2, pdg::PHOTON, Status::Propagator, ph2, &[b2]);
        ev.add(
            Role::OutgoingBeam1,
            self.beam_pdg.0,
            remnant_status(self.mode.dissociates_first()),
            p3,
            &[b1],
        );
        ev.add(
            Role::OutgoingBeam2,
            self.beam_pdg.1,
            remnant_status(self.mode.dissociates_second()),
            p5,
            &[b2],
        );
        // the two-lepton system has no PDG identity
        let c = ev.add(Role::Intermediate, 0, Status::Propagator, p6 + p7, &[g1, g2]);
        let l1 = ev.add(Role::CentralSystem, self.pair, Status::FinalState, p6, &[c]);
        let l2 = ev.add(Role::CentralSystem, self.pair, Status::FinalState, p7, &[c]);
        ev.particles[l1].charge_sign = ransign;
        ev.particles[l2].charge_sign = -ransign;
        ev.weight = k.weight;

        Some(ev)
    }

    fn box_clone(&self) -> Box<dyn Process> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BeamSettings;

    fn settings(mode: ProcessMode, pz: f64) -> KinematicsSettings {
        let mut k = KinematicsSettings::default();
        k.mode = mode;
        k.beam1 = BeamSettings {
            pdg: pdg::PROTON,
            pz,
        };
        k.beam2 = k.beam1.clone();
        k
    }

    #[test]
    fn dissociation_requires_a_mass_range() {
        let err = GamGamLL::new(&settings(ProcessMode::InelasticElastic, 50.), 0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::MissingRange("mx".to_owned()))
        );

        let mut k = settings(ProcessMode::InelasticInelastic, 50.);
        k.cuts.mx = Limits::new(1.07, 20.).unwrap();
        assert_eq!(GamGamLL::new(&k, 0).unwrap().ndim(), 9);
    }

    #[test]
    fn below_threshold_is_rejected_at_construction() {
        assert!(GamGamLL::new(&settings(ProcessMode::ElasticElastic, 0.), 0).is_err());
    }

    #[test]
    fn event_of_the_last_accepted_point() {
        let mut p = GamGamLL::new(&settings(ProcessMode::ElasticElastic, 50.), 0).unwrap();
        let mut rng = <StdRng as rand::SeedableRng>::seed_from_u64(7);

        let mut found = false;
        for i in 0..2000 {
            let x: Vec<f64> = (0..7).map(|_| rng.gen::<f64>()).collect();
            let w = p.weight(&x);
            if w > 0. {
                let ev = p.event(&mut rng).unwrap();
                assert_eq!(ev.particles.len(), 9);
                assert_eq!(ev.weight, w);
                let l1 = &ev.particles[7];
                let l2 = &ev.particles[8];
                assert_eq!(l1.charge_sign, -l2.charge_sign);
                assert_eq!(ev.particles[6].mothers.as_slice(), &[2, 3]);
                found = true;
                break;
            }
            assert!(p.event(&mut rng).is_none(), "no event for rejected point {}", i);
        }
        assert!(found);
    }
}
