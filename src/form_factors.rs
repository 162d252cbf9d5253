use serde::Deserialize;
use std::fmt;

/// Electric and magnetic form factors entering the `γ*` vertex of a beam leg.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FormFactors {
    pub fe: f64,
    pub fm: f64,
}

impl FormFactors {
    /// Point-like coupling.
    pub fn trivial() -> FormFactors {
        FormFactors { fe: 1., fm: 1. }
    }

    /// Elastic proton vertex with dipole Sachs form factors.
    pub fn standard_dipole(q2: f64, mi2: f64) -> FormFactors {
        let ge = (1. + q2 / 0.71).powi(-2);
        let gm = 2.79 * ge;
        FormFactors {
            fe: (4. * mi2 * ge * ge + q2 * gm * gm) / (4. * mi2 + q2),
            fm: gm * gm,
        }
    }

    /// Suri-Yennie fit of the proton dissociation into a remnant of squared mass `mf2`.
    pub fn suri_yennie(q2: f64, mi2: f64, mf2: f64) -> FormFactors {
        const CC1: f64 = 0.86926;
        const CC2: f64 = 2.23422;
        const DD1: f64 = 0.12549;
        const CP: f64 = 0.96;
        const BP: f64 = 0.63;
        const RHO: f64 = 0.585;

        let x = q2 / (q2 + mf2);
        let dm2 = mf2 - mi2;
        let en = dm2 + q2;
        let tau = -q2 / (4. * mi2);
        let rhot = RHO + q2;

        let fm = (CC1 * (RHO / rhot).powi(2) * dm2
            + CC2 * mi2 * (1. - x).powi(4) / (x * (x * CP - 2. * BP) + 1.))
            / q2;
        let fe = (-tau * fm + DD1 * dm2 * q2 * (RHO / rhot) * (dm2 / en).powi(2) / (rhot * mi2))
            / (1. + en * en / (4. * mi2 * q2));
        FormFactors { fe, fm }
    }
}

/// Model used for a beam leg.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub enum FormFactorsModel {
    #[serde(rename = "trivial")]
    Trivial,
    #[serde(rename = "standard_dipole")]
    StandardDipole,
    #[serde(rename = "suri_yennie")]
    SuriYennie,
}

impl FormFactorsModel {
    /// Form factors at virtuality `q2` for a leg of incoming squared mass `mi2`
    /// and outgoing squared mass `mf2`.
    pub fn evaluate(&self, q2: f64, mi2: f64, mf2: f64) -> FormFactors {
        match self {
            FormFactorsModel::Trivial => FormFactors::trivial(),
            FormFactorsModel::StandardDipole => FormFactors::standard_dipole(q2, mi2),
            FormFactorsModel::SuriYennie => FormFactors::suri_yennie(q2, mi2, mf2),
        }
    }
}

impl fmt::Display for FormFactorsModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormFactorsModel::Trivial => write!(f, "trivial"),
            FormFactorsModel::StandardDipole => write!(f, "standard_dipole"),
            FormFactorsModel::SuriYennie => write!(f, "suri_yennie"),
        }
    }
}

impl Default for FormFactorsModel {
    fn default() -> FormFactorsModel {
        FormFactorsModel::SuriYennie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dipole_at_zero_virtuality() {
        let ff = FormFactors::standard_dipole(0., 0.88);
        assert!((ff.fe - 1.).abs() < 1e-12);
        assert!((ff.fm - 2.79 * 2.79).abs() < 1e-12);

        let ff = FormFactors::standard_dipole(0.71, 0.88);
        assert!(ff.fe < 0.25 && ff.fe > 0.);
    }

    #[test]
    fn suri_yennie_is_finite_above_threshold() {
        let mp2 = 0.938272046f64.powi(2);
        let ff = FormFactorsModel::SuriYennie.evaluate(2.5, mp2, 1.8f64.powi(2));
        assert!(ff.fe.is_finite() && ff.fm.is_finite());
        assert!(ff.fm > 0.);
    }
}
