//! Reference spine signalling network
//!
//! Five modules of the structural-plasticity model of a dendritic spine:
//! calcium/CaMKII, Cdc42/Arp2/3, cofilin, actin/membrane and Rho/myosin.
//! Rate constants are those of the published model. Species shared between
//! modules (F-actin, G-actin, active Arp2/3, CaMKIIp, PP1act, ROCKact, …)
//! receive the sum of every module's contributions.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::network::{Factor, LayerDefinition, LayeredSystem, NetworkDefinition, Reaction, Term};
use crate::species::{Species, N_SPECIES};

use Species::*;

/// Denominator of the CaMKII-driven RhoGEF activation flux
///
/// The published model divides by `1 + RhoGEF` where `RhoGEF` is the
/// species *index* (36), not its concentration. Which one was intended is
/// not settled, so the recorded behaviour stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhoGefActivation {
    /// `0.01·CaMKIIp·RhoGEF / (1 + 36)`, as published
    #[default]
    AsRecorded,
    /// `0.01·CaMKIIp·RhoGEF / (1 + [RhoGEF])`, Michaelis–Menten like the
    /// other GEF activations
    Saturating,
}

/// Choices that alter the reference topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Form of the RhoGEF activation flux
    pub rhogef_activation: RhoGefActivation,
}

/// Species pairs `(A, A*)` exchanged only through shared fluxes, so
/// `A + A*` is invariant along any trajectory
pub const CONSERVED_PAIRS: [(Species, Species); 13] = [
    (Ng, NgCaM),
    (CaN, CaNact),
    (I1, I1act),
    (PP1, PP1act),
    (Cdc42GEF, Cdc42GEFact),
    (GAP, GAPact),
    (SSH1, SSH1act),
    (LIMK, LIMKact),
    (Cofilin, Cofilinact),
    (RhoGEF, RhoGEFact),
    (ROCK, ROCKact),
    (MyoPpase, MyoPpaseact),
    (MLC, MLCact),
];

/// Coefficient of the cofilin severing flux: 0.1 · 0.0002 / 0.0001
const SEVERING: f64 = 0.1 * 0.0002 / 0.0001;

/// Nucleation rate constant of the Arp2/3 branch
const NUCLEATION: f64 = 15.3;

/// Barbed ends created per severing or nucleation event
const BARBED_ENDS_PER_EVENT: f64 = 106.0;

fn x(species: Species) -> Factor {
    Factor::Species(species)
}

fn pow(species: Species, exponent: f64) -> Factor {
    Factor::Power { species, exponent }
}

fn hill(species: Species, km: f64, hill: f64) -> Factor {
    Factor::Saturation { species, km, hill }
}

fn mm(species: Species, km: f64) -> Factor {
    hill(species, km, 1.0)
}

fn term<const K: usize>(coefficient: f64, factors: [Factor; K]) -> Term {
    Term::new(coefficient, factors)
}

fn layer(name: &str, reactions: Vec<Reaction>) -> LayerDefinition {
    LayerDefinition {
        name: name.to_string(),
        reactions,
    }
}

fn calcium_camkii() -> LayerDefinition {
    layer(
        "calcium_camkii",
        vec![
            Reaction::new(
                "ca_cam_binding",
                vec![term(7.75, [pow(Ca, 3.0)]), term(-1.0, [x(CaCaM)])],
                &[(Ca, -3.0), (CaM, -1.0), (CaCaM, 1.0)],
            ),
            Reaction::new(
                "ng_cam_binding",
                vec![term(5.0, [x(Ng), x(CaM)]), term(-1.0, [x(NgCaM)])],
                &[(CaM, -1.0), (Ng, -1.0), (NgCaM, 1.0)],
            ),
            Reaction::new(
                "camkii_factin_binding",
                vec![term(1.0, [x(CaMKII), x(Factin)]), term(-4.0, [x(CaMKIIFactin)])],
                &[(CaMKII, -1.0), (Factin, -1.0), (CaMKIIFactin, 1.0)],
            ),
            Reaction::new(
                "camkii_gactin_binding",
                vec![term(1.0, [x(CaMKII), x(Gactin)]), term(-4.0, [x(CaMKIIGactin)])],
                &[(CaMKII, -1.0), (Gactin, -1.0), (CaMKIIGactin, 1.0)],
            ),
            Reaction::new(
                "camkii_phosphorylation",
                vec![
                    term(120.0, [x(CaMKII), hill(CaCaM, 4.0, 4.0)]),
                    term(1.0, [x(CaMKIIp), mm(CaMKII, 10.0)]),
                ],
                &[(CaMKII, -1.0), (CaMKIIp, 1.0)],
            ),
            Reaction::new(
                "camkii_dephosphorylation",
                vec![term(15.0, [x(PP1act), mm(CaMKIIp, 3.0)])],
                &[(CaMKII, 1.0), (CaMKIIp, -1.0)],
            ),
            Reaction::new(
                "can_activation",
                vec![term(127.0, [x(CaN), hill(CaCaM, 0.34, 4.0)])],
                &[(CaN, -1.0), (CaNact, 1.0)],
            ),
            Reaction::new(
                "can_deactivation",
                vec![term(0.34, [x(CaMKIIp), mm(CaN, 127.0)])],
                &[(CaN, 1.0), (CaNact, -1.0)],
            ),
            Reaction::new(
                "i1_activation",
                vec![term(0.034, [x(CaNact), mm(I1, 4.97)])],
                &[(I1, -1.0), (I1act, 1.0)],
            ),
            Reaction::new(
                "i1_deactivation",
                vec![term(0.0688, [x(CaMKIIp), mm(I1act, 127.0)])],
                &[(I1, 1.0), (I1act, -1.0)],
            ),
            Reaction::new(
                "pp1_activation",
                vec![
                    term(50.0, [x(I1act), mm(PP1, 80.0)]),
                    term(2.0, [x(PP1act), mm(PP1, 80.0)]),
                ],
                &[(PP1, -1.0), (PP1act, 1.0)],
            ),
            Reaction::new(
                "pp1_deactivation",
                vec![term(0.07166, [x(CaMKIIp), mm(PP1act, 4.97)])],
                &[(PP1, 1.0), (PP1act, -1.0)],
            ),
        ],
    )
}

fn cdc42_arp23() -> LayerDefinition {
    layer(
        "cdc42_arp23",
        vec![
            Reaction::new(
                "cdc42gef_activation",
                vec![term(0.01, [x(CaMKIIp), mm(Cdc42GEF, 1.0)])],
                &[(Cdc42GEF, -1.0), (Cdc42GEFact, 1.0)],
            ),
            Reaction::new(
                "cdc42gef_deactivation",
                vec![term(0.01, [x(PP1act), mm(Cdc42GEFact, 1.0)])],
                &[(Cdc42GEF, 1.0), (Cdc42GEFact, -1.0)],
            ),
            Reaction::new(
                "cdc42_gtp_loading",
                vec![term(0.75, [x(Cdc42GEFact), mm(Cdc42GDP, 1.0)])],
                &[(Cdc42GDP, -1.0), (Cdc42GTP, 1.0)],
            ),
            Reaction::new(
                "cdc42_gtp_hydrolysis",
                vec![term(0.1, [x(GAPact), mm(Cdc42GTP, 1.0)])],
                &[(Cdc42GDP, 1.0), (Cdc42GTP, -1.0)],
            ),
            Reaction::new(
                "gap_activation",
                vec![term(0.01, [x(CaMKIIp), mm(GAP, 1.0)])],
                &[(GAP, -1.0), (GAPact, 1.0)],
            ),
            Reaction::new(
                "gap_deactivation",
                vec![term(0.01, [x(PP1act), mm(GAPact, 1.0)])],
                &[(GAP, 1.0), (GAPact, -1.0)],
            ),
            Reaction::new(
                "wasp_activation",
                vec![term(0.02, [x(Cdc42GTP), x(WASP)]), term(-0.001, [x(WASPact)])],
                &[(Cdc42GTP, -1.0), (WASP, -1.0), (WASPact, 1.0)],
            ),
            Reaction::new(
                "arp23_activation",
                vec![term(0.1, [x(Arp23), x(WASPact)])],
                &[(WASPact, -1.0), (Arp23, -1.0), (Arp23act, 1.0)],
            ),
        ],
    )
}

fn cofilin() -> LayerDefinition {
    layer(
        "cofilin",
        vec![
            Reaction::new(
                "ssh1_activation",
                vec![term(0.34, [x(CaNact), mm(SSH1, 4.97)])],
                &[(SSH1, -1.0), (SSH1act, 1.0)],
            ),
            Reaction::new(
                "ssh1_deactivation",
                vec![term(127.0, [x(CaMKIIp), mm(SSH1act, 0.34)])],
                &[(SSH1, 1.0), (SSH1act, -1.0)],
            ),
            Reaction::new(
                "limk_activation",
                vec![term(0.9, [x(ROCKact), mm(LIMK, 0.3)])],
                &[(LIMK, -1.0), (LIMKact, 1.0)],
            ),
            Reaction::new(
                "limk_deactivation",
                vec![term(0.34, [x(SSH1act), mm(LIMKact, 4.0)])],
                &[(LIMK, 1.0), (LIMKact, -1.0)],
            ),
            Reaction::new(
                "cofilin_activation",
                vec![term(0.34, [x(SSH1act), mm(Cofilin, 4.0)])],
                &[(Cofilin, -1.0), (Cofilinact, 1.0)],
            ),
            Reaction::new(
                "cofilin_deactivation",
                vec![term(0.34, [x(LIMKact), mm(Cofilinact, 4.0)])],
                &[(Cofilin, 1.0), (Cofilinact, -1.0)],
            ),
        ],
    )
}

fn actin_membrane() -> LayerDefinition {
    // severing = SEVERING·Cofilinact⁴·Factin
    // nucleation = NUCLEATION·Factin·Gactin·Arp23act/(2 + Arp23act)
    let severing = |scale: f64| term(scale * SEVERING, [x(Factin), pow(Cofilinact, 4.0)]);
    let nucleation =
        |scale: f64| term(scale * NUCLEATION, [x(Factin), x(Gactin), mm(Arp23act, 2.0)]);

    layer(
        "actin_membrane",
        vec![
            Reaction::new(
                "filament_maturation",
                vec![term(0.001, [x(Fnewactin)])],
                &[(Fnewactin, -1.0), (Factin, 1.0)],
            ),
            Reaction::new(
                "depolymerization",
                vec![severing(1.0), term(0.1, [x(Factin)]), term(0.01, [x(Factin)])],
                &[(Factin, -1.0), (Gactin, 1.0)],
            ),
            Reaction::new(
                "nucleation",
                vec![nucleation(1.0)],
                &[(Gactin, -1.0), (Arp23act, -1.0)],
            ),
            Reaction::new(
                "barbed_end_turnover",
                vec![
                    severing(BARBED_ENDS_PER_EVENT),
                    nucleation(BARBED_ENDS_PER_EVENT),
                    term(-0.04, [x(B)]),
                ],
                &[(B, 1.0)],
            ),
            Reaction::new(
                "membrane_barbed_ends",
                vec![
                    term(0.1, [x(B)]),
                    term(
                        -0.1,
                        [
                            x(B),
                            Factor::Ratchet {
                                species: Bp,
                                scale: 10.0,
                                barrier: 50.0,
                            },
                        ],
                    ),
                    term(-0.04, [x(Bp)]),
                ],
                &[(Bp, 1.0)],
            ),
        ],
    )
}

fn rho_myosin(options: &ModelOptions) -> LayerDefinition {
    let rhogef_activation = match options.rhogef_activation {
        RhoGefActivation::AsRecorded => term(
            0.01 / (1.0 + RhoGEF.index() as f64),
            [x(CaMKIIp), x(RhoGEF)],
        ),
        RhoGefActivation::Saturating => term(0.01, [x(CaMKIIp), mm(RhoGEF, 1.0)]),
    };

    layer(
        "rho_myosin",
        vec![
            Reaction::new(
                "rhogef_activation",
                vec![rhogef_activation],
                &[(RhoGEF, -1.0), (RhoGEFact, 1.0)],
            ),
            Reaction::new(
                "rhogef_deactivation",
                vec![term(0.1, [x(PP1act), mm(RhoGEFact, 1.0)])],
                &[(RhoGEF, 1.0), (RhoGEFact, -1.0)],
            ),
            Reaction::new(
                "rho_gtp_loading",
                vec![term(0.75, [x(RhoGEFact), mm(RhoGDP, 1.0)])],
                &[(RhoGDP, -1.0), (RhoGTP, 1.0)],
            ),
            Reaction::new(
                "rho_gtp_hydrolysis",
                vec![term(0.1, [x(GAPact), mm(RhoGTP, 1.0)])],
                &[(RhoGDP, 1.0), (RhoGTP, -1.0)],
            ),
            Reaction::new(
                "rock_activation",
                vec![term(0.02, [x(RhoGTP), x(ROCK)]), term(-0.001, [x(ROCKact)])],
                &[(RhoGTP, -1.0), (ROCK, -1.0), (ROCKact, 1.0)],
            ),
            Reaction::new(
                "myoppase_activation",
                vec![
                    term(0.01, [x(MyoPpase)]),
                    term(3.0, [x(MyoPpaseact), mm(MyoPpase, 16.0)]),
                ],
                &[(MyoPpase, -1.0), (MyoPpaseact, 1.0)],
            ),
            Reaction::new(
                "myoppase_deactivation",
                vec![term(2.357, [x(ROCKact), mm(MyoPpaseact, 0.1)])],
                &[(MyoPpase, 1.0), (MyoPpaseact, -1.0)],
            ),
            Reaction::new(
                "mlc_phosphorylation",
                vec![
                    term(0.01, [x(MLC)]),
                    term(1.8, [x(ROCKact), mm(MLC, 2.47)]),
                ],
                &[(MLC, -1.0), (MLCact, 1.0)],
            ),
            Reaction::new(
                "mlc_dephosphorylation",
                vec![term(1.0, [x(MyoPpaseact), mm(MLCact, 16.0)])],
                &[(MLC, 1.0), (MLCact, -1.0)],
            ),
        ],
    )
}

/// Definition of the five-module spine network
pub fn reference_network(options: &ModelOptions) -> NetworkDefinition {
    NetworkDefinition {
        layers: vec![
            calcium_camkii(),
            cdc42_arp23(),
            cofilin(),
            actin_membrane(),
            rho_myosin(options),
        ],
    }
}

/// Compiled right-hand side of the five-module spine network
pub fn reference_system(options: &ModelOptions) -> Result<LayeredSystem<N_SPECIES>, ConfigError> {
    reference_network(options).compile()
}
