use serde::de::{Deserializer, Error, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Momentum;

struct MomentumVisitor;

impl<'de> Visitor<'de> for MomentumVisitor {
    type Value = Momentum;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("four floats")
    }

    fn visit_seq<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: SeqAccess<'de>,
    {
        let px = access
            .next_element::<f64>()?
            .ok_or_else(|| M::Error::custom("Cannot read x-component"))?;
        let py = access
            .next_element::<f64>()?
            .ok_or_else(|| M::Error::custom("Cannot read y-component"))?;
        let pz = access
            .next_element::<f64>()?
            .ok_or_else(|| M::Error::custom("Cannot read z-component"))?;
        let e = access
            .next_element::<f64>()?
            .ok_or_else(|| M::Error::custom("Cannot read energy"))?;

        Ok(Momentum::from_px_py_pz_e(px, py, pz, e))
    }
}

impl<'de> Deserialize<'de> for Momentum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(MomentumVisitor)
    }
}

/// Momenta are written as `[px, py, pz, E]`; the cached norm is rebuilt on reading.
impl Serialize for Momentum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(4))?;
        seq.serialize_element(&self.px())?;
        seq.serialize_element(&self.py())?;
        seq.serialize_element(&self.pz())?;
        seq.serialize_element(&self.energy())?;
        seq.end()
    }
}
