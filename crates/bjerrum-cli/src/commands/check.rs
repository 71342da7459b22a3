use crate::cli::CheckArgs;
use crate::error::Result;
use bjerrum::engine::config::RunConfig;

pub fn run(args: CheckArgs) -> Result<()> {
    let config = RunConfig::load(&args.config)?;
    let registry = config.build_registry()?;
    let geometry = config.geometry.build()?;
    config
        .potential
        .build(&registry, config.system.bjerrum_length())?;

    let particles: usize = config.species.iter().map(|s| s.count).sum();
    println!("  Run file         {}", args.config.display());
    println!("  Species          {}", registry.len());
    println!("  Particles        {}", particles);
    println!("  Cell volume      {:.1} A^3", geometry.volume());
    println!(
        "  Bjerrum length   {:.3} A",
        config.system.bjerrum_length()
    );
    println!(
        "  Schedule         {} sweeps x {} steps",
        config.system.sweeps, config.system.steps_per_sweep
    );
    Ok(())
}
