//! Species registry and state vector
//!
//! The spine model tracks 46 concentrations. Each species owns one stable
//! index for the lifetime of a run; the index order is the column order of
//! the recorded trajectory.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of species in the spine network
pub const N_SPECIES: usize = 46;

/// Concentration vector indexed by [`Species::index`]
pub type State = [f64; N_SPECIES];

macro_rules! species {
    ($($name:ident),+ $(,)?) => {
        /// A chemical species of the spine network
        ///
        /// Variants are declared in index order; `Species::Ca.index() == 0`.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Species {
            $($name),+
        }

        impl Species {
            /// Every species, in index order
            pub const ALL: [Species; N_SPECIES] = [$(Species::$name),+];

            /// Name used in configuration files and output headers
            pub const fn name(self) -> &'static str {
                match self {
                    $(Species::$name => stringify!($name)),+
                }
            }
        }
    };
}

species!(
    // calcium / CaMKII module
    Ca, CaM, CaCaM, Ng, NgCaM, CaMKII, Factin, CaMKIIFactin, Gactin, CaMKIIGactin, CaMKIIp,
    CaN, CaNact, I1, I1act, PP1, PP1act,
    // Cdc42 / Arp2/3 module
    Cdc42GEF, Cdc42GEFact, Cdc42GDP, Cdc42GTP, GAP, GAPact, WASP, WASPact, Arp23, Arp23act,
    // cofilin module
    SSH1, SSH1act, LIMK, LIMKact, Cofilin, Cofilinact,
    // actin / membrane module
    Fnewactin, B, Bp,
    // Rho / myosin module
    RhoGEF, RhoGEFact, RhoGDP, RhoGTP, ROCK, ROCKact, MyoPpase, MyoPpaseact, MLC, MLCact,
);

impl Species {
    /// Stable index of this species in a [`State`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Species stored at `index`, if any
    pub fn from_index(index: usize) -> Option<Species> {
        Species::ALL.get(index).copied()
    }

    /// Names of all species in index order (the output header)
    pub fn names() -> [&'static str; N_SPECIES] {
        Species::ALL.map(Species::name)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .iter()
            .copied()
            .find(|sp| sp.name() == s)
            .ok_or_else(|| ConfigError::UnknownSpecies(s.to_string()))
    }
}

/// Initial concentrations by species name
///
/// Species absent from the map start at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitialConditions(pub BTreeMap<String, f64>);

impl InitialConditions {
    /// Initial table of the published spine model
    pub fn reference() -> Self {
        let table = [
            (Species::Ca, 1.0),
            (Species::CaMKIIFactin, 10.0),
            (Species::CaMKIIGactin, 10.0),
            (Species::CaN, 1.0),
            (Species::CaM, 10.0),
            (Species::Ng, 20.0),
            (Species::I1, 1.8),
            (Species::PP1, 0.27),
            (Species::WASP, 1.0),
            (Species::Arp23, 1.0),
            (Species::Cdc42GDP, 1.0),
            (Species::Cdc42GEF, 0.1),
            (Species::LIMK, 2.0),
            (Species::SSH1, 2.0),
            (Species::Cofilin, 2.0),
            (Species::Bp, 1.0),
            (Species::B, 30.0),
            (Species::MyoPpaseact, 0.1),
            (Species::RhoGEF, 0.1),
            (Species::RhoGDP, 1.0),
            (Species::ROCK, 1.0),
            (Species::MyoPpase, 1.1),
            (Species::MLC, 5.0),
            (Species::GAP, 0.1),
        ];
        Self(
            table
                .iter()
                .map(|&(sp, value)| (sp.name().to_string(), value))
                .collect(),
        )
    }

    /// Set one species, replacing any previous value
    pub fn set(&mut self, species: Species, value: f64) {
        self.0.insert(species.name().to_string(), value);
    }

    /// Build the state vector, rejecting unknown names and non-finite values
    pub fn to_state(&self) -> Result<State, ConfigError> {
        let mut state = [0.0; N_SPECIES];
        for (name, &value) in &self.0 {
            let species: Species = name.parse()?;
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field: format!("initial_conditions.{}", name),
                    message: "must be finite".to_string(),
                });
            }
            state[species.index()] = value;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_stable_and_dense() {
        assert_eq!(Species::ALL.len(), N_SPECIES);
        for (i, sp) in Species::ALL.iter().enumerate() {
            assert_eq!(sp.index(), i);
            assert_eq!(Species::from_index(i), Some(*sp));
        }
        assert_eq!(Species::Ca.index(), 0);
        assert_eq!(Species::RhoGEF.index(), 36);
        assert_eq!(Species::MLCact.index(), N_SPECIES - 1);
        assert_eq!(Species::from_index(N_SPECIES), None);
    }

    #[test]
    fn test_name_round_trip() {
        for sp in Species::ALL {
            assert_eq!(sp.name().parse::<Species>().unwrap(), sp);
        }
        assert!(matches!(
            "Calcium".parse::<Species>(),
            Err(ConfigError::UnknownSpecies(name)) if name == "Calcium"
        ));
    }

    #[test]
    fn test_names_are_unique() {
        let names = Species::names();
        let mut sorted = names.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), N_SPECIES);
        assert_eq!(names[2], "CaCaM");
    }

    #[test]
    fn test_reference_initial_state() {
        let state = InitialConditions::reference().to_state().unwrap();
        assert_eq!(state[Species::Ca.index()], 1.0);
        assert_eq!(state[Species::CaM.index()], 10.0);
        assert_eq!(state[Species::Ng.index()], 20.0);
        assert_eq!(state[Species::B.index()], 30.0);
        // Unlisted species default to zero
        assert_eq!(state[Species::CaCaM.index()], 0.0);
        assert_eq!(state[Species::Fnewactin.index()], 0.0);
        assert_eq!(state.iter().filter(|v| **v != 0.0).count(), 24);
    }

    #[test]
    fn test_unknown_initial_species_rejected() {
        let mut ic = InitialConditions::default();
        ic.0.insert("Myosin".to_string(), 1.0);
        assert!(matches!(ic.to_state(), Err(ConfigError::UnknownSpecies(_))));
    }

    #[test]
    fn test_non_finite_initial_value_rejected() {
        let mut ic = InitialConditions::default();
        ic.set(Species::Ca, f64::NAN);
        assert!(matches!(ic.to_state(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_species_serde_by_name() {
        let sp: Species = serde_yaml::from_str("CaMKIIp").unwrap();
        assert_eq!(sp, Species::CaMKIIp);
        let text = serde_yaml::to_string(&Species::ROCKact).unwrap();
        assert_eq!(text.trim(), "ROCKact");
    }
}
