use crate::ConfigurationError;
use color_eyre::Report;

pub const PROTON: i64 = 2212;
pub const PHOTON: i64 = 22;
pub const ELECTRON: i64 = 11;
pub const MUON: i64 = 13;
pub const TAU: i64 = 15;
pub const PI_ZERO: i64 = 111;
pub const PI_PLUS: i64 = 211;

pub const PROTON_MASS: f64 = 0.938272046;
pub const PI_ZERO_MASS: f64 = 0.1349766;

/// Conversion factor from GeV⁻² to picobarn.
pub const GEV2_TO_PB: f64 = 0.389351824e9;
/// Phase-space normalisation `(2π)^-5 / 4` in units of the LPAIR matrix element.
pub const SCONSTB: f64 = 2.1868465e10;

/// Mass in GeV of a particle given its PDG identifier (sign ignored).
pub fn mass(pdg_id: i64) -> Result<f64, Report> {
    Ok(match pdg_id.abs() {
        PROTON => PROTON_MASS,
        PHOTON => 0.,
        ELECTRON => 0.510998928e-3,
        MUON => 0.1056583745,
        TAU => 1.77682,
        PI_ZERO => PI_ZERO_MASS,
        PI_PLUS => 0.13957018,
        _ => return Err(ConfigurationError::UnknownParticle(pdg_id).into()),
    })
}

pub fn name(pdg_id: i64) -> &'static str {
    match pdg_id.abs() {
        PROTON => "proton",
        PHOTON => "photon",
        ELECTRON => "electron",
        MUON => "muon",
        TAU => "tau",
        PI_ZERO => "pi0",
        PI_PLUS => "pi+",
        _ => "unknown",
    }
}

/// Electric charge in units of `e` of the particle (not antiparticle).
pub fn charge(pdg_id: i64) -> f64 {
    match pdg_id.abs() {
        PROTON | PI_PLUS => 1.,
        ELECTRON | MUON | TAU => -1.,
        _ => 0.,
    }
}

pub fn is_lepton(pdg_id: i64) -> bool {
    matches!(pdg_id.abs(), ELECTRON | MUON | TAU)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_particle_is_a_configuration_error() {
        let err = mass(999_999).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::UnknownParticle(999_999))
        );
        assert_eq!(mass(-13).unwrap(), mass(13).unwrap());
        assert!(is_lepton(-11) && !is_lepton(PROTON));
    }
}
