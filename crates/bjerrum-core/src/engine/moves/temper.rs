use super::{AcceptanceMap, MoveError, MoveStatistics, TrialMove};
use crate::core::models::particle::Particle;
use crate::core::models::space::{Frame, Space};
use crate::engine::hamiltonian::Hamiltonian;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Replica transport failure with partner {partner}: {message}")]
    Failed { partner: usize, message: String },
}

/// Blocking message transport between replica processes.
///
/// The framework contains no transport implementation; MPI or in-process
/// channels plug in behind this trait. All calls block until the partner
/// has posted the matching operation, so send/receive ordering must be
/// deterministic across ranks.
pub trait ReplicaTransport {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn send_floats(&mut self, to: usize, data: &[f64]) -> Result<(), TransportError>;

    fn recv_floats(&mut self, from: usize, count: usize) -> Result<Vec<f64>, TransportError>;

    fn send_particles(&mut self, to: usize, particles: &[Particle]) -> Result<(), TransportError>;

    fn recv_particles(&mut self, from: usize) -> Result<Vec<Particle>, TransportError>;
}

/// Parallel tempering (replica exchange) between independent Markov chains.
///
/// Partners alternate between even and odd rank pairings. The two replicas
/// exchange full particle configurations (lower rank sends first), each
/// evaluates the received configuration, and the summed energy change
/// decides the swap. Only the lower rank draws the Metropolis number; the
/// verdict is transmitted so both chains take the same branch. Replica
/// volumes are assumed equal.
pub struct ParallelTempering<T: ReplicaTransport> {
    transport: T,
    even_phase: bool,
    partner: Option<usize>,
    own_energy_change: f64,
    statistics: MoveStatistics,
    per_partner: AcceptanceMap<usize>,
}

impl<T: ReplicaTransport> ParallelTempering<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            even_phase: true,
            partner: None,
            own_energy_change: 0.0,
            statistics: MoveStatistics::default(),
            per_partner: AcceptanceMap::new(),
        }
    }

    pub fn per_partner(&self) -> &AcceptanceMap<usize> {
        &self.per_partner
    }

    fn is_deciding_rank(&self) -> bool {
        match self.partner {
            Some(partner) => self.transport.rank() < partner,
            None => false,
        }
    }

    /// Alternating even/odd rank-offset pairing.
    fn find_partner(&self) -> Option<usize> {
        let rank = self.transport.rank();
        let up = if self.even_phase {
            rank % 2 == 0
        } else {
            rank % 2 == 1
        };
        let partner = if up {
            rank.checked_add(1)
        } else {
            rank.checked_sub(1)
        }?;
        (partner < self.transport.size()).then_some(partner)
    }

    fn send_verdict(&mut self, accepted: bool) {
        if !self.is_deciding_rank() {
            return;
        }
        let partner = self.partner.expect("deciding rank has a partner");
        let verdict = if accepted { 1.0 } else { 0.0 };
        if let Err(error) = self.transport.send_floats(partner, &[verdict]) {
            warn!(%error, "failed to transmit exchange verdict");
        }
    }
}

impl<T: ReplicaTransport> TrialMove for ParallelTempering<T> {
    fn label(&self) -> &'static str {
        "temper"
    }

    fn statistics(&self) -> &MoveStatistics {
        &self.statistics
    }

    fn statistics_mut(&mut self) -> &mut MoveStatistics {
        &mut self.statistics
    }

    fn propose(&mut self, _space: &mut Space, _rng: &mut StdRng) -> Result<(), MoveError> {
        self.partner = self.find_partner();
        self.even_phase = !self.even_phase;
        Ok(())
    }

    fn energy_change(&mut self, space: &mut Space, hamiltonian: &Hamiltonian) -> f64 {
        let Some(partner) = self.partner else {
            // Unpaired edge rank this phase; nothing to exchange.
            return f64::INFINITY;
        };
        let rank = self.transport.rank();

        // Exchange configurations with deterministic ordering.
        let received = if rank < partner {
            if let Err(error) = self.transport.send_particles(partner, &space.particles) {
                warn!(%error, "configuration exchange failed");
                return f64::INFINITY;
            }
            self.transport.recv_particles(partner)
        } else {
            let received = self.transport.recv_particles(partner);
            if let Err(error) = self.transport.send_particles(partner, &space.particles) {
                warn!(%error, "configuration exchange failed");
                return f64::INFINITY;
            }
            received
        };
        let received = match received {
            Ok(received) => received,
            Err(error) => {
                warn!(%error, "configuration exchange failed");
                return f64::INFINITY;
            }
        };
        if received.len() != space.len() {
            warn!(
                received = received.len(),
                local = space.len(),
                "partner configuration has mismatched particle count"
            );
            return f64::INFINITY;
        }

        let u_old = hamiltonian.system_energy(space, Frame::Current);
        space.trial = received;
        let u_new = hamiltonian.system_energy(space, Frame::Trial);
        self.own_energy_change = u_new - u_old;

        // Exchange the local energy changes, same ordering as above.
        let du_partner = if rank < partner {
            if let Err(error) = self
                .transport
                .send_floats(partner, &[self.own_energy_change])
            {
                warn!(%error, "energy exchange failed");
                return f64::INFINITY;
            }
            self.transport.recv_floats(partner, 1)
        } else {
            let received = self.transport.recv_floats(partner, 1);
            if let Err(error) = self
                .transport
                .send_floats(partner, &[self.own_energy_change])
            {
                warn!(%error, "energy exchange failed");
                return f64::INFINITY;
            }
            received
        };
        let du_partner = match du_partner {
            Ok(values) => values[0],
            Err(error) => {
                warn!(%error, "energy exchange failed");
                return f64::INFINITY;
            }
        };

        if rank < partner {
            // The deciding rank runs the joint Metropolis test itself.
            self.own_energy_change + du_partner
        } else {
            // The partner's verdict arrives after its accept/reject step.
            match self.transport.recv_floats(partner, 1) {
                Ok(verdict) if verdict[0] > 0.5 => f64::NEG_INFINITY,
                Ok(_) => f64::INFINITY,
                Err(error) => {
                    warn!(%error, "verdict exchange failed");
                    f64::INFINITY
                }
            }
        }
    }

    fn accept(&mut self, space: &mut Space) {
        space.commit_all();
        for index in 0..space.groups.len() {
            space.update_mass_center(index);
        }
        if let Some(partner) = self.partner {
            self.per_partner.accept(partner, 0.0);
        }
        self.send_verdict(true);
    }

    fn reject(&mut self, space: &mut Space) {
        space.restore_all();
        if let Some(partner) = self.partner {
            self.per_partner.reject(partner);
        }
        self.send_verdict(false);
    }

    fn alternate_energy(&self) -> Option<f64> {
        Some(self.own_energy_change)
    }
}
