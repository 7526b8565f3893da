//! # rhomyosin: adaptive simulation of dendritic-spine signalling
//!
//! Integrates the structural-plasticity network of a dendritic spine
//! (calcium/CaMKII, Cdc42/Arp2/3, cofilin, actin/membrane and Rho/myosin
//! modules, 46 species) with an embedded Bogacki–Shampine 3(2) stepper and
//! records the trajectory on a fixed sampling grid.
//!
//! ## Features
//!
//! - Adaptive Bogacki–Shampine 3(2) pair with first-same-as-last reuse of
//!   the final stage (three right-hand-side evaluations per attempt)
//! - Step-size control with configurable safety, growth and shrink caps and
//!   a fatal underflow below the minimum step
//! - Reaction networks as data: layers of reactions whose rate laws are sums
//!   of products of mass-action, Hill and ratchet factors, loadable from YAML
//! - Layers only *add* to the derivative, so module order never matters
//! - CSV output with bit-exact round-trip numbers
//!
//! ## Basic Usage
//!
//! ```rust
//! use rhomyosin::{
//!     reference_system, Driver, InitialConditions, IntegrationConfig, MemoryRecorder,
//!     ModelOptions, Species,
//! };
//!
//! let system = reference_system(&ModelOptions::default()).unwrap();
//! let x0 = InitialConditions::reference().to_state().unwrap();
//!
//! let config = IntegrationConfig {
//!     t_end: 5.0,
//!     ..Default::default()
//! };
//! let driver = Driver::new(config).unwrap();
//!
//! let mut recorder = MemoryRecorder::new();
//! let summary = driver
//!     .run(&system, &x0, &Species::names(), &mut recorder)
//!     .unwrap();
//!
//! assert_eq!(summary.final_time, 5.0);
//! assert_eq!(recorder.len(), 51);
//! ```
//!
//! ## Custom systems
//!
//! The stepper and driver are generic over any [`OdeSystem`] of fixed
//! dimension, so they can be used without the spine network:
//!
//! ```rust
//! use rhomyosin::{Driver, IntegrationConfig, MemoryRecorder, OdeSystem};
//!
//! struct Decay;
//!
//! impl OdeSystem<1> for Decay {
//!     fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
//!         dydt[0] = -y[0];
//!     }
//! }
//!
//! let driver = Driver::new(IntegrationConfig { t_end: 1.0, ..Default::default() }).unwrap();
//! let mut recorder = MemoryRecorder::new();
//! let summary = driver.run(&Decay, &[1.0], &["x"], &mut recorder).unwrap();
//! assert!((summary.final_state[0] - (-1.0f64).exp()).abs() < 1e-4);
//! ```
//!
//! ## References
//!
//! 1. Bogacki, P. & Shampine, L.F. (1989). "A 3(2) pair of Runge–Kutta
//!    formulas". Applied Mathematics Letters 2(4), 321–325.
//!
//! 2. Hairer, E., Nørsett, S.P., & Wanner, G. (1993). "Solving
//!    Ordinary Differential Equations I: Nonstiff Problems".
//!    Springer.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod coefficients;
pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod network;
pub mod recorder;
pub mod solver;
pub mod species;

pub use config::{IntegrationConfig, SimulationConfig};
pub use driver::{Driver, RunSummary, SamplePolicy};
pub use error::{ConfigError, RecorderError, SimulationError};
pub use model::{reference_network, reference_system, ModelOptions, RhoGefActivation};
pub use network::{
    load_network, Contributions, Factor, Layer, LayerDefinition, LayeredSystem, NetworkDefinition,
    Reaction, ReactionLayer, Term,
};
pub use recorder::{CsvRecorder, MemoryRecorder, Recorder};
pub use solver::{
    Bs23, IntegrationError, OdeSystem, Stats, StepController, StepResult, StepState, Tolerances,
};
pub use species::{InitialConditions, Species, State, N_SPECIES};
