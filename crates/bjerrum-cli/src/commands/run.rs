use crate::cli::RunArgs;
use crate::error::Result;
use crate::progress::SweepProgress;
use bjerrum::core::io::SpaceSnapshot;
use bjerrum::engine::config::RunConfig;
use bjerrum::engine::progress::ProgressReporter;
use bjerrum::workflows::simulate::{self, Assembly, SimulationReport};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let config = RunConfig::load(&args.config)?;
    let seed = args.seed.unwrap_or(config.system.seed);
    let sweeps = args.sweeps.unwrap_or(config.system.sweeps);
    let mut rng = StdRng::seed_from_u64(seed);
    info!(config = %args.config.display(), seed, sweeps, "setting up simulation");

    let Assembly {
        mut space,
        mut hamiltonian,
        mut moves,
        ..
    } = simulate::assemble(&config, &mut rng)?;

    if let Some(state) = &args.state {
        info!(state = %state.display(), "loading starting configuration");
        SpaceSnapshot::load(state)?.apply(&mut space)?;
    }

    let progress = SweepProgress::new();
    let reporter = ProgressReporter::with_callback(progress.callback());
    let report = simulate::run(
        &mut space,
        &mut hamiltonian,
        &mut moves,
        sweeps,
        config.system.steps_per_sweep,
        &reporter,
        &mut rng,
    )?;
    drop(reporter);

    print_report(&report);

    if let Some(output) = &args.output {
        SpaceSnapshot::capture(&space).save(output)?;
        info!(output = %output.display(), "final configuration written");
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!();
    println!("  Initial energy   {:>14.4} kT", report.initial_energy);
    println!("  Final energy     {:>14.4} kT", report.final_energy);
    println!(
        "  Mean energy      {:>14.4} kT ({:.4})",
        report.mean_energy.avg(),
        report.mean_energy.stdev()
    );
    println!("  Energy drift     {:>14.2e} kT", report.drift);
    println!();
    println!(
        "  {:<18} {:>10} {:>10} {:>8} {:>14}",
        "Move", "Trials", "Accepted", "Acc %", "sqrt(msq)/A"
    );
    for mv in &report.moves {
        println!(
            "  {:<18} {:>10} {:>10} {:>7.1}% {:>14.3}",
            mv.label,
            mv.attempts,
            mv.accepted,
            100.0 * mv.acceptance,
            mv.mean_square_displacement.sqrt()
        );
    }
}
