use crate::core::models::group::GroupKind;
use crate::core::models::particle::Particle;
use crate::core::models::space::{Frame, Space};
use crate::core::models::species::SpeciesRegistry;
use crate::core::potential::dispatch::PotentialMap;
use crate::core::stats::Average;
use crate::engine::config::RunConfig;
use crate::engine::drift::EnergyDrift;
use crate::engine::error::EngineError;
use crate::engine::hamiltonian::Hamiltonian;
use crate::engine::moves::gcmc::GrandCanonicalSalt;
use crate::engine::moves::translate::AtomicTranslation;
use crate::engine::moves::transrot::TranslateRotate;
use crate::engine::moves::volume::Isobaric;
use crate::engine::moves::{TrialMove, perform};
use crate::engine::progress::{Progress, ProgressReporter};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use tracing::{debug, info, instrument};

const MAX_INSERTION_ATTEMPTS: usize = 1000;

/// A move with its selection weight in the sweep loop.
pub struct WeightedMove {
    pub mv: Box<dyn TrialMove>,
    pub weight: f64,
}

/// Everything a run needs, assembled from a [`RunConfig`].
pub struct Assembly {
    pub registry: SpeciesRegistry,
    pub space: Space,
    pub hamiltonian: Hamiltonian,
    pub moves: Vec<WeightedMove>,
}

#[derive(Debug, Clone)]
pub struct MoveReport {
    pub label: &'static str,
    pub attempts: u64,
    pub accepted: u64,
    pub acceptance: f64,
    pub mean_square_displacement: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub initial_energy: f64,
    pub final_energy: f64,
    pub mean_energy: Average,
    pub drift: f64,
    pub moves: Vec<MoveReport>,
}

/// Places `count` particles of one species without hard-core overlap
/// against the ones already inserted.
fn place_species(
    space: &Space,
    placed: &[Particle],
    id: usize,
    registry: &SpeciesRegistry,
    count: usize,
    rng: &mut StdRng,
) -> Result<Vec<Particle>, EngineError> {
    let species = registry.get(id).expect("registered species");
    let mut particles: Vec<Particle> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut attempts = 0;
        loop {
            let position = space.geometry.random_position(rng);
            let candidate = Particle::from_species(id, species, position);
            let overlaps = placed
                .iter()
                .chain(particles.iter())
                .chain(space.particles.iter())
                .any(|other| {
                    let contact = candidate.contact_distance(other);
                    space.geometry.sqdist(&candidate.position, &other.position)
                        < contact * contact
                });
            if !overlaps {
                particles.push(candidate);
                break;
            }
            attempts += 1;
            if attempts >= MAX_INSERTION_ATTEMPTS {
                return Err(EngineError::Initialization(format!(
                    "could not place {} particles of species '{}' without overlap",
                    count, species.name
                )));
            }
        }
    }
    Ok(particles)
}

/// Builds the registry, space, Hamiltonian and move set from a run
/// configuration.
#[instrument(skip_all, name = "assemble")]
pub fn assemble(config: &RunConfig, rng: &mut StdRng) -> Result<Assembly, EngineError> {
    let registry = config.build_registry()?;
    let geometry = config.geometry.build()?;
    let mut space = Space::new(geometry);

    let bjerrum = config.system.bjerrum_length();
    let potential = config.potential.build(&registry, bjerrum)?;
    debug!(potential = %potential.name(), bjerrum, "nonbonded potential assembled");
    let mut hamiltonian =
        Hamiltonian::new(PotentialMap::new(potential)).with_cutoff_table(&registry);

    // Grand-canonical ions share one reservoir group; everything else gets a
    // group per species.
    let salt_species: Vec<usize> = match &config.moves.salt {
        Some(salt) => vec![
            registry
                .id_of(&salt.cation)
                .map_err(|e| EngineError::Initialization(e.to_string()))?,
            registry
                .id_of(&salt.anion)
                .map_err(|e| EngineError::Initialization(e.to_string()))?,
        ],
        None => Vec::new(),
    };

    let mut salt_particles = Vec::new();
    let mut salt_group = None;
    for entry in &config.species {
        if entry.count == 0 {
            continue;
        }
        let id = registry
            .id_of(&entry.species.name)
            .expect("species registered above");
        let particles = place_species(&space, &salt_particles, id, &registry, entry.count, rng)?;
        if salt_species.contains(&id) {
            salt_particles.extend(particles);
        } else {
            space.enroll(&entry.species.name, GroupKind::Atomic, particles)?;
        }
    }
    if !salt_particles.is_empty() {
        salt_group = Some(space.enroll("salt", GroupKind::Atomic, salt_particles)?);
    }

    let mut moves: Vec<WeightedMove> = Vec::new();
    if let Some(translate) = &config.moves.translate {
        for (index, group) in space.groups.iter().enumerate() {
            if group.kind != GroupKind::Atomic {
                continue;
            }
            let mut mv = AtomicTranslation::new(translate.displacement)
                .with_run_fraction(translate.run_fraction);
            mv.set_group(index);
            moves.push(WeightedMove {
                mv: Box::new(mv),
                weight: group.len() as f64,
            });
        }
    }
    if let Some(transrot) = &config.moves.transrot {
        for (index, group) in space.groups.iter().enumerate() {
            if group.kind != GroupKind::Molecular {
                continue;
            }
            let mut mv = TranslateRotate::new(transrot.displacement, transrot.rotation)
                .with_run_fraction(transrot.run_fraction);
            mv.set_group(index);
            moves.push(WeightedMove {
                mv: Box::new(mv),
                weight: 1.0,
            });
        }
    }
    if let Some(volume) = &config.moves.volume {
        let mv = Isobaric::new(volume.volume_displacement, volume.pressure, &mut hamiltonian)
            .with_run_fraction(volume.run_fraction);
        moves.push(WeightedMove {
            mv: Box::new(mv),
            weight: 1.0,
        });
    }
    if let Some(salt) = &config.moves.salt {
        let group = salt_group.ok_or_else(|| {
            EngineError::Initialization(
                "grand-canonical salt move needs initial salt particles".into(),
            )
        })?;
        let mv = GrandCanonicalSalt::new(&registry, group, &salt.cation, &salt.anion)?
            .with_run_fraction(salt.run_fraction);
        moves.push(WeightedMove {
            mv: Box::new(mv),
            weight: 1.0,
        });
    }

    Ok(Assembly {
        registry,
        space,
        hamiltonian,
        moves,
    })
}

/// Runs a full Markov chain: weighted move selection, sweep loop, per-sweep
/// drift checks and progress reporting.
#[instrument(skip_all, name = "simulate_workflow")]
pub fn run(
    space: &mut Space,
    hamiltonian: &mut Hamiltonian,
    moves: &mut [WeightedMove],
    sweeps: u64,
    steps_per_sweep: u64,
    reporter: &ProgressReporter,
    rng: &mut StdRng,
) -> Result<SimulationReport, EngineError> {
    if moves.is_empty() {
        return Err(EngineError::Initialization(
            "no moves configured for this run".into(),
        ));
    }
    let selector = WeightedIndex::new(moves.iter().map(|m| m.weight))
        .map_err(|e| EngineError::Initialization(format!("bad move weights: {}", e)))?;

    let initial_energy = hamiltonian.system_energy(space, Frame::Current);
    info!(initial_energy, sweeps, steps_per_sweep, "starting Markov chain");
    let mut drift_tracker = EnergyDrift::new(initial_energy);
    let mut mean_energy = Average::new();
    let mut drift = 0.0;

    reporter.report(Progress::RunStart {
        total_sweeps: sweeps,
    });
    for sweep in 0..sweeps {
        for _ in 0..steps_per_sweep {
            let selected = selector.sample(rng);
            let du = perform(
                moves[selected].mv.as_mut(),
                space,
                hamiltonian,
                rng,
                1,
            )?;
            drift_tracker.track(du);
        }

        let recomputed = hamiltonian.system_energy(space, Frame::Current);
        drift = drift_tracker.check(recomputed);
        mean_energy.add(recomputed);
        reporter.report(Progress::SweepFinish {
            sweep,
            energy: recomputed,
            drift,
        });

        // Density-dependent screening is only ever updated between trials.
        hamiltonian.rescale_screening(space);
    }
    reporter.report(Progress::RunFinish);

    let final_energy = hamiltonian.system_energy(space, Frame::Current);
    info!(final_energy, drift, "Markov chain finished");

    let move_reports = moves
        .iter()
        .map(|m| {
            let stats = m.mv.statistics();
            MoveReport {
                label: m.mv.label(),
                attempts: stats.attempts,
                accepted: stats.accepted,
                acceptance: stats.acceptance(),
                mean_square_displacement: stats.mean_square_displacement.avg(),
            }
        })
        .collect();

    Ok(SimulationReport {
        initial_energy,
        final_energy,
        mean_energy,
        drift,
        moves: move_reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::sync::Mutex;

    fn run_config(extra_moves: &str) -> RunConfig {
        let content = format!(
            r#"
            [system]
            temperature = 298.15
            dielectric = 78.7
            sweeps = 3
            steps_per_sweep = 50
            seed = 9

            [geometry]
            kind = "cuboid"
            length = 60.0

            [[species]]
            name = "Na"
            charge = 1.0
            radius = 1.9
            activity = 1e-4
            count = 10

            [[species]]
            name = "Cl"
            charge = -1.0
            radius = 2.1
            activity = 1e-4
            count = 10

            [potential]
            kind = "debye-huckel"
            ionic_strength = 0.1

            [moves.translate]
            displacement = 2.0
            {extra_moves}
            "#
        );
        toml::from_str(&content).unwrap()
    }

    #[test]
    fn assemble_populates_the_requested_particle_counts() {
        let config = run_config("");
        let mut rng = StdRng::seed_from_u64(config.system.seed);
        let assembly = assemble(&config, &mut rng).unwrap();

        assert_eq!(assembly.space.len(), 20);
        assert_eq!(assembly.space.groups.len(), 2);
        assert!(!assembly.moves.is_empty());
        // Initial placement is overlap-free.
        let u = assembly
            .hamiltonian
            .system_energy(&assembly.space, Frame::Current);
        assert!(u.is_finite());
    }

    #[test]
    fn salt_species_share_one_reservoir_group() {
        let config = run_config("[moves.salt]\ncation = \"Na\"\nanion = \"Cl\"");
        let mut rng = StdRng::seed_from_u64(1);
        let assembly = assemble(&config, &mut rng).unwrap();

        assert_eq!(assembly.space.groups.len(), 1);
        assert_eq!(assembly.space.groups[0].name, "salt");
        assert_eq!(assembly.space.groups[0].len(), 20);
    }

    #[test]
    fn run_reports_statistics_and_bounded_drift() {
        let config = run_config("");
        let mut rng = StdRng::seed_from_u64(config.system.seed);
        let Assembly {
            mut space,
            mut hamiltonian,
            mut moves,
            ..
        } = assemble(&config, &mut rng).unwrap();

        let reporter = ProgressReporter::new();
        let report = run(
            &mut space,
            &mut hamiltonian,
            &mut moves,
            3,
            50,
            &reporter,
            &mut rng,
        )
        .unwrap();

        assert!(report.final_energy.is_finite());
        assert_eq!(report.mean_energy.count(), 3);
        assert!(report.drift.abs() < 1e-6);
        let total_attempts: u64 = report.moves.iter().map(|m| m.attempts).sum();
        assert_eq!(total_attempts, 150);
    }

    #[test]
    fn run_emits_progress_events_in_order() {
        let config = run_config("");
        let mut rng = StdRng::seed_from_u64(2);
        let Assembly {
            mut space,
            mut hamiltonian,
            mut moves,
            ..
        } = assemble(&config, &mut rng).unwrap();

        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(format!("{:?}", event));
        }));
        run(
            &mut space,
            &mut hamiltonian,
            &mut moves,
            2,
            10,
            &reporter,
            &mut rng,
        )
        .unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert!(events.first().unwrap().starts_with("RunStart"));
        assert!(events.last().unwrap().starts_with("RunFinish"));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn running_without_moves_is_an_initialization_error() {
        let config = run_config("");
        let mut rng = StdRng::seed_from_u64(3);
        let Assembly {
            mut space,
            mut hamiltonian,
            ..
        } = assemble(&config, &mut rng).unwrap();

        let reporter = ProgressReporter::new();
        let result = run(
            &mut space,
            &mut hamiltonian,
            &mut [],
            1,
            1,
            &reporter,
            &mut rng,
        );
        assert!(matches!(result, Err(EngineError::Initialization(_))));
    }
}
