//! Layered reaction-network evaluator
//!
//! A network is an ordered list of layers, one per biological module. Each
//! layer computes its fluxes from the current state and *adds* `ν·v` to the
//! derivative of every species the flux touches. The evaluator zero-fills
//! the derivative once per call, so no layer ever needs to know whether an
//! earlier layer already wrote to a slot and the result does not depend on
//! which module first "introduced" a species.
//!
//! Rate laws are data: a flux is a sum of [`Term`]s, each a coefficient
//! times a product of [`Factor`]s. This covers mass action (`k·A·B − k'·C`),
//! Michaelis–Menten and Hill switches (`V·E·Sⁿ/(Kⁿ + Sⁿ)`) and the
//! membrane-ratchet velocity of the actin module. Definitions are serde
//! types, so a topology can be read from YAML with [`load_network`].

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::solver::OdeSystem;
use crate::species::{Species, State, N_SPECIES};

/// Multiplicative building block of a rate law
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Plain concentration `x`
    Species(Species),
    /// `xⁿ`
    Power {
        /// Species raised to the power
        species: Species,
        /// Exponent `n`
        exponent: f64,
    },
    /// Saturating switch `xⁿ / (kmⁿ + xⁿ)`; `hill = 1` is Michaelis–Menten
    Saturation {
        /// Substrate species
        species: Species,
        /// Half-saturation constant
        km: f64,
        /// Hill coefficient
        hill: f64,
    },
    /// Brownian-ratchet velocity `x / (x + scale·exp(barrier / x))`, zero at `x = 0`
    Ratchet {
        /// Species setting the load
        species: Species,
        /// Prefactor of the exponential barrier
        scale: f64,
        /// Barrier height
        barrier: f64,
    },
}

impl Factor {
    /// Evaluate the factor at state `x`
    #[inline]
    pub fn eval(&self, x: &State) -> f64 {
        match *self {
            Factor::Species(sp) => x[sp.index()],
            Factor::Power { species, exponent } => x[species.index()].powf(exponent),
            Factor::Saturation { species, km, hill } => {
                let xn = x[species.index()].powf(hill);
                xn / (km.powf(hill) + xn)
            }
            Factor::Ratchet {
                species,
                scale,
                barrier,
            } => {
                let v = x[species.index()];
                if v == 0.0 {
                    0.0
                } else {
                    v / (v + scale * (barrier / v).exp())
                }
            }
        }
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Factor::Species(_) => Vec::new(),
            Factor::Power { exponent, .. } => vec![("exponent", exponent)],
            Factor::Saturation { km, hill, .. } => vec![("km", km), ("hill", hill)],
            Factor::Ratchet { scale, barrier, .. } => vec![("scale", scale), ("barrier", barrier)],
        }
    }
}

/// `coefficient × Π factors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Rate constant (sign included)
    pub coefficient: f64,
    /// Factors multiplied onto the coefficient, left to right
    #[serde(default)]
    pub factors: Vec<Factor>,
}

impl Term {
    /// Build a term from a coefficient and its factors
    pub fn new(coefficient: f64, factors: impl Into<Vec<Factor>>) -> Self {
        Self {
            coefficient,
            factors: factors.into(),
        }
    }

    /// Evaluate the term at state `x`
    #[inline]
    pub fn eval(&self, x: &State) -> f64 {
        self.factors
            .iter()
            .fold(self.coefficient, |acc, factor| acc * factor.eval(x))
    }
}

/// One named flux and the species it changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Flux name, unique within its layer
    pub name: String,
    /// The flux is the sum of these terms
    pub rate: Vec<Term>,
    /// Stoichiometric coefficient per affected species
    pub stoichiometry: BTreeMap<Species, f64>,
}

impl Reaction {
    /// Build a reaction
    pub fn new(name: &str, rate: Vec<Term>, stoichiometry: &[(Species, f64)]) -> Self {
        Self {
            name: name.to_string(),
            rate,
            stoichiometry: stoichiometry.iter().copied().collect(),
        }
    }

    /// Flux value at state `x`
    #[inline]
    pub fn flux(&self, x: &State) -> f64 {
        self.rate.iter().fold(0.0, |acc, term| acc + term.eval(x))
    }
}

/// Serialized form of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDefinition {
    /// Module name, e.g. `cofilin`
    pub name: String,
    /// Fluxes of the module, evaluated in order
    pub reactions: Vec<Reaction>,
}

/// Serialized form of a complete network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    /// Layers in evaluation order
    pub layers: Vec<LayerDefinition>,
}

impl NetworkDefinition {
    /// Validate every layer and build the evaluator
    pub fn compile(&self) -> Result<LayeredSystem<N_SPECIES>, ConfigError> {
        let mut system = LayeredSystem::new();
        for layer in &self.layers {
            system.push(ReactionLayer::new(layer.clone())?);
        }
        Ok(system)
    }

    /// Total number of fluxes across all layers
    pub fn reaction_count(&self) -> usize {
        self.layers.iter().map(|l| l.reactions.len()).sum()
    }
}

/// Read a network definition from a YAML file
pub fn load_network(path: &Path) -> Result<NetworkDefinition, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_reader(file)?)
}

/// Additive view of a derivative vector handed to each layer
///
/// Layers can only add to a slot; the evaluator owns initialization.
pub struct Contributions<'a, const N: usize> {
    dxdt: &'a mut [f64; N],
}

impl<const N: usize> Contributions<'_, N> {
    /// Add `value` to the derivative of species `index`
    #[inline]
    pub fn add(&mut self, index: usize, value: f64) {
        self.dxdt[index] += value;
    }
}

/// A module of the right-hand side
pub trait Layer<const N: usize> {
    /// Module name, used in diagnostics
    fn name(&self) -> &str;

    /// Add this module's contributions at `(t, x)`
    ///
    /// Must depend on `t` and `x` only; the partially summed derivative is
    /// not visible.
    fn contribute(&self, t: f64, x: &[f64; N], out: &mut Contributions<'_, N>);
}

/// Data-driven layer over the spine species
#[derive(Debug, Clone)]
pub struct ReactionLayer {
    definition: LayerDefinition,
    /// Per reaction: (species index, stoichiometric coefficient)
    targets: Vec<Vec<(usize, f64)>>,
}

impl ReactionLayer {
    /// Validate a layer definition
    pub fn new(definition: LayerDefinition) -> Result<Self, ConfigError> {
        let mut targets = Vec::with_capacity(definition.reactions.len());
        for reaction in &definition.reactions {
            let field = format!("network.{}.{}", definition.name, reaction.name);
            if reaction.rate.is_empty() {
                return Err(ConfigError::invalid(&field, "rate has no terms"));
            }
            if reaction.stoichiometry.is_empty() {
                return Err(ConfigError::invalid(&field, "stoichiometry is empty"));
            }
            for term in &reaction.rate {
                if !term.coefficient.is_finite() {
                    return Err(ConfigError::invalid(&field, "coefficient must be finite"));
                }
                for factor in &term.factors {
                    for (param, value) in factor.parameters() {
                        if !value.is_finite() {
                            return Err(ConfigError::invalid(
                                &field,
                                format!("{} must be finite", param),
                            ));
                        }
                    }
                }
            }
            if let Some((sp, _)) = reaction.stoichiometry.iter().find(|(_, nu)| !nu.is_finite()) {
                return Err(ConfigError::invalid(
                    &field,
                    format!("stoichiometry of {} must be finite", sp),
                ));
            }
            targets.push(
                reaction
                    .stoichiometry
                    .iter()
                    .map(|(sp, &nu)| (sp.index(), nu))
                    .collect(),
            );
        }
        Ok(Self {
            definition,
            targets,
        })
    }

    /// Reactions of this layer
    pub fn reactions(&self) -> &[Reaction] {
        &self.definition.reactions
    }

    /// Flux values at `x`, by reaction name
    pub fn fluxes<'a>(&'a self, x: &'a State) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.definition
            .reactions
            .iter()
            .map(move |r| (r.name.as_str(), r.flux(x)))
    }
}

impl Layer<N_SPECIES> for ReactionLayer {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn contribute(&self, _t: f64, x: &State, out: &mut Contributions<'_, N_SPECIES>) {
        for (reaction, targets) in self.definition.reactions.iter().zip(&self.targets) {
            let v = reaction.flux(x);
            for &(index, nu) in targets {
                out.add(index, nu * v);
            }
        }
    }
}

/// Right-hand side composed of ordered layers
pub struct LayeredSystem<const N: usize> {
    layers: Vec<Box<dyn Layer<N>>>,
}

impl<const N: usize> LayeredSystem<N> {
    /// Empty system (`dx/dt = 0`)
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer after the existing ones
    pub fn push<L: Layer<N> + 'static>(&mut self, layer: L) {
        self.layers.push(Box::new(layer));
    }

    /// Layer names in evaluation order
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }
}

impl<const N: usize> Default for LayeredSystem<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> OdeSystem<N> for LayeredSystem<N> {
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]) {
        dydt.fill(0.0);
        let mut out = Contributions { dxdt: dydt };
        for layer in &self.layers {
            layer.contribute(t, y, &mut out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds a fixed vector of (index, value) pairs
    struct Constant {
        name: &'static str,
        entries: Vec<(usize, f64)>,
    }

    impl Layer<3> for Constant {
        fn name(&self) -> &str {
            self.name
        }

        fn contribute(&self, _t: f64, _x: &[f64; 3], out: &mut Contributions<'_, 3>) {
            for &(i, v) in &self.entries {
                out.add(i, v);
            }
        }
    }

    fn state_with(values: &[(Species, f64)]) -> State {
        let mut x = [0.0; N_SPECIES];
        for &(sp, v) in values {
            x[sp.index()] = v;
        }
        x
    }

    #[test]
    fn test_factor_forms() {
        let x = state_with(&[(Species::Ca, 2.0), (Species::Bp, 1.0)]);

        assert_eq!(Factor::Species(Species::Ca).eval(&x), 2.0);
        assert_eq!(
            Factor::Power {
                species: Species::Ca,
                exponent: 3.0
            }
            .eval(&x),
            8.0
        );

        // Michaelis–Menten at x = km is one half
        let mm = Factor::Saturation {
            species: Species::Ca,
            km: 2.0,
            hill: 1.0,
        };
        assert_eq!(mm.eval(&x), 0.5);

        // Hill switch: 2^4 / (1^4 + 2^4)
        let hill = Factor::Saturation {
            species: Species::Ca,
            km: 1.0,
            hill: 4.0,
        };
        assert!((hill.eval(&x) - 16.0 / 17.0).abs() < 1e-15);

        let ratchet = Factor::Ratchet {
            species: Species::Bp,
            scale: 10.0,
            barrier: 1.0,
        };
        let expected = 1.0 / (1.0 + 10.0 * 1.0_f64.exp());
        assert!((ratchet.eval(&x) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_ratchet_is_zero_without_load() {
        let x = [0.0; N_SPECIES];
        let ratchet = Factor::Ratchet {
            species: Species::Bp,
            scale: 10.0,
            barrier: 50.0,
        };
        assert_eq!(ratchet.eval(&x), 0.0);
    }

    #[test]
    fn test_reaction_flux_sums_terms() {
        // v = 5·Ng·CaM − NgCaM
        let reaction = Reaction::new(
            "binding",
            vec![
                Term::new(5.0, [Factor::Species(Species::Ng), Factor::Species(Species::CaM)]),
                Term::new(-1.0, [Factor::Species(Species::NgCaM)]),
            ],
            &[(Species::Ng, -1.0), (Species::NgCaM, 1.0)],
        );
        let x = state_with(&[(Species::Ng, 2.0), (Species::CaM, 3.0), (Species::NgCaM, 4.0)]);
        assert_eq!(reaction.flux(&x), 26.0);
    }

    #[test]
    fn test_layer_order_does_not_matter() {
        let a = || Constant {
            name: "a",
            entries: vec![(0, 1.5), (1, -2.0)],
        };
        let b = || Constant {
            name: "b",
            entries: vec![(1, 0.25), (2, 4.0)],
        };

        let mut forward = LayeredSystem::<3>::new();
        forward.push(a());
        forward.push(b());
        let mut reverse = LayeredSystem::<3>::new();
        reverse.push(b());
        reverse.push(a());

        let y = [0.0; 3];
        let mut d1 = [f64::NAN; 3];
        let mut d2 = [f64::NAN; 3];
        forward.rhs(0.0, &y, &mut d1);
        reverse.rhs(0.0, &y, &mut d2);

        assert_eq!(d1, [1.5, -1.75, 4.0]);
        assert_eq!(d1, d2);
        assert_eq!(forward.layer_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_every_slot_initialized() {
        // Output buffer starts as garbage; untouched slots must come back as zero
        let mut system = LayeredSystem::<3>::new();
        system.push(Constant {
            name: "only_first",
            entries: vec![(0, 1.0)],
        });
        let mut d = [f64::NAN; 3];
        system.rhs(0.0, &[0.0; 3], &mut d);
        assert_eq!(d, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_network_from_yaml() {
        let yaml = r#"
layers:
  - name: toy
    reactions:
      - name: activation
        rate:
          - coefficient: 2.0
            factors:
              - species: CaMKIIp
              - saturation: { species: PP1, km: 1.0, hill: 1.0 }
        stoichiometry: { PP1: -1.0, PP1act: 1.0 }
"#;
        let definition: NetworkDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(definition.reaction_count(), 1);
        let system = definition.compile().unwrap();

        let x = state_with(&[(Species::CaMKIIp, 1.0), (Species::PP1, 1.0)]);
        let mut dxdt = [0.0; N_SPECIES];
        system.rhs(0.0, &x, &mut dxdt);

        assert_eq!(dxdt[Species::PP1.index()], -1.0);
        assert_eq!(dxdt[Species::PP1act.index()], 1.0);
        assert_eq!(dxdt.iter().filter(|v| **v != 0.0).count(), 2);
        let layer = ReactionLayer::new(definition.layers[0].clone()).unwrap();
        assert_eq!(layer.name(), "toy");
        assert_eq!(layer.reactions().len(), 1);
        assert_eq!(layer.reactions()[0].name, "activation");
        assert_eq!(layer.reactions()[0].stoichiometry.len(), 2);
    }

    #[test]
    fn test_invalid_layer_rejected() {
        let empty_stoich = LayerDefinition {
            name: "bad".to_string(),
            reactions: vec![Reaction::new("v1", vec![Term::new(1.0, Vec::<Factor>::new())], &[])],
        };
        assert!(matches!(
            ReactionLayer::new(empty_stoich),
            Err(ConfigError::Invalid { .. })
        ));

        let nan_km = LayerDefinition {
            name: "bad".to_string(),
            reactions: vec![Reaction::new(
                "v1",
                vec![Term::new(
                    1.0,
                    [Factor::Saturation {
                        species: Species::Ca,
                        km: f64::NAN,
                        hill: 1.0,
                    }],
                )],
                &[(Species::Ca, -1.0)],
            )],
        };
        let err = ReactionLayer::new(nan_km).unwrap_err();
        assert!(err.to_string().contains("km"), "{}", err);
    }
}
