//! Integrate a network read from YAML instead of the built-in model
//!
//! ```text
//! cargo run --example custom_network
//! ```

use rhomyosin::{
    Driver, InitialConditions, IntegrationConfig, MemoryRecorder, NetworkDefinition, Species,
};

const NETWORK: &str = include_str!("../config/phosphatase_switch.yaml");

fn main() -> anyhow::Result<()> {
    let network: NetworkDefinition = serde_yaml::from_str(NETWORK)?;
    let system = network.compile()?;

    let mut initial = InitialConditions::default();
    initial.set(Species::Ca, 1.0);
    initial.set(Species::CaMKII, 10.0);
    initial.set(Species::PP1, 0.27);
    let x0 = initial.to_state()?;

    let driver = Driver::new(IntegrationConfig {
        t_end: 50.0,
        sample_interval: 5.0,
        ..Default::default()
    })?;
    let mut recorder = MemoryRecorder::new();
    let summary = driver.run(&system, &x0, &Species::names(), &mut recorder)?;

    println!("{:>6} {:>12} {:>12} {:>12}", "t", "CaMKIIp", "PP1", "PP1act");
    for (t, x) in recorder.times.iter().zip(&recorder.states) {
        println!(
            "{:>6.1} {:>12.6} {:>12.6} {:>12.6}",
            t,
            x[Species::CaMKIIp.index()],
            x[Species::PP1.index()],
            x[Species::PP1act.index()]
        );
    }
    println!();
    println!("{summary}");
    Ok(())
}
