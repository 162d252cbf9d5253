use crate::pdg;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use tabled::{Table, Tabled};
use vector::Momentum;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    IncomingBeam1,
    IncomingBeam2,
    Parton1,
    Parton2,
    OutgoingBeam1,
    OutgoingBeam2,
    Intermediate,
    CentralSystem,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::IncomingBeam1 => write!(f, "in-beam 1"),
            Role::IncomingBeam2 => write!(f, "in-beam 2"),
            Role::Parton1 => write!(f, "parton 1"),
            Role::Parton2 => write!(f, "parton 2"),
            Role::OutgoingBeam1 => write!(f, "out-beam 1"),
            Role::OutgoingBeam2 => write!(f, "out-beam 2"),
            Role::Intermediate => write!(f, "intermediate"),
            Role::CentralSystem => write!(f, "central"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Status {
    Incoming,
    Propagator,
    FinalState,
    /// Dissociated beam remnant, left for an external hadronisation step.
    Unfragmented,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Incoming => write!(f, "incoming"),
            Status::Propagator => write!(f, "propagator"),
            Status::FinalState => write!(f, "final"),
            Status::Unfragmented => write!(f, "unfragmented"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    pub id: usize,
    pub role: Role,
    pub pdg_id: i64,
    /// `+1` for the particle, `-1` for its antiparticle.
    pub charge_sign: i8,
    pub momentum: Momentum,
    pub status: Status,
    pub mothers: SmallVec<[usize; 2]>,
    pub daughters: SmallVec<[usize; 2]>,
}

impl Particle {
    pub fn new(id: usize, role: Role, pdg_id: i64, status: Status) -> Particle {
        Particle {
            id,
            role,
            pdg_id,
            charge_sign: 1,
            momentum: Momentum::default(),
            status,
            mothers: SmallVec::new(),
            daughters: SmallVec::new(),
        }
    }

    pub fn charge(&self) -> f64 {
        pdg::charge(self.pdg_id) * self.charge_sign as f64
    }

    /// Signed PDG identifier.
    pub fn integer_pdg_id(&self) -> i64 {
        self.pdg_id * self.charge_sign as i64
    }
}

#[derive(Tabled)]
struct ParticleRow {
    id: usize,
    role: Role,
    pdg: i64,
    status: Status,
    mothers: String,
    px: String,
    py: String,
    pz: String,
    e: String,
    m: String,
}

impl From<&Particle> for ParticleRow {
    fn from(p: &Particle) -> ParticleRow {
        ParticleRow {
            id: p.id,
            role: p.role,
            pdg: p.integer_pdg_id(),
            status: p.status,
            mothers: p
                .mothers
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(","),
            px: format!("{:.4e}", p.momentum.px()),
            py: format!("{:.4e}", p.momentum.py()),
            pz: format!("{:.4e}", p.momentum.pz()),
            e: format!("{:.4e}", p.momentum.energy()),
            m: format!("{:.4e}", p.momentum.mass()),
        }
    }
}

/// Full record of one generated point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Event {
    pub particles: Vec<Particle>,
    pub weight: f64,
}

impl Event {
    /// Add a particle, linking it to its mothers.
    pub fn add(
        &mut self,
        role: Role,
        pdg_id: i64,
        status: Status,
        momentum: Momentum,
        mothers: &[usize],
    ) -> usize {
        let id = self.particles.len();
        let mut p = Particle::new(id, role, pdg_id, status);
        p.momentum = momentum;
        for &m in mothers {
            p.mothers.push(m);
            self.particles[m].daughters.push(id);
        }
        self.particles.push(p);
        id
    }

    pub fn by_role(&self, role: Role) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(move |p| p.role == role)
    }

    pub fn one_with_role(&self, role: Role) -> Option<&Particle> {
        let mut it = self.by_role(role);
        match (it.next(), it.next()) {
            (Some(p), None) => Some(p),
            _ => None,
        }
    }

    /// Sum of the incoming momenta minus the sum of the final-state momenta.
    pub fn momentum_balance(&self) -> Momentum {
        let mut balance = Momentum::default();
        for p in &self.particles {
            match p.status {
                Status::Incoming => balance += p.momentum,
                Status::FinalState | Status::Unfragmented => balance -= p.momentum,
                Status::Propagator => {}
            }
        }
        balance
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Event weight: {:e}", self.weight)?;
        let rows: Vec<ParticleRow> = self.particles.iter().map(ParticleRow::from).collect();
        write!(f, "{}", Table::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_of_a_two_body_decay() {
        let mut ev = Event::default();
        let parent = ev.add(
            Role::IncomingBeam1,
            pdg::PROTON,
            Status::Incoming,
            Momentum::from_px_py_pz_e(0., 0., 3., 5.),
            &[],
        );
        let a = ev.add(
            Role::CentralSystem,
            pdg::MUON,
            Status::FinalState,
            Momentum::from_px_py_pz_e(1., 0., 1.5, 2.5),
            &[parent],
        );
        ev.add(
            Role::CentralSystem,
            pdg::MUON,
            Status::FinalState,
            Momentum::from_px_py_pz_e(-1., 0., 1.5, 2.5),
            &[parent],
        );
        ev.particles[a].charge_sign = -1;

        assert_eq!(ev.momentum_balance(), Momentum::default());
        assert_eq!(ev.particles[parent].daughters.as_slice(), &[1, 2]);
        assert!(ev.one_with_role(Role::CentralSystem).is_none());
        assert_eq!(ev.one_with_role(Role::IncomingBeam1).map(|p| p.id), Some(0));
        assert_eq!(ev.particles[a].integer_pdg_id(), -13);
        assert!(ev.to_string().contains("in-beam 1"));
    }
}
