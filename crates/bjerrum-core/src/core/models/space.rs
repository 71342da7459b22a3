use crate::core::geometry::Geometry;
use crate::core::models::group::{Group, GroupKind};
use crate::core::models::particle::Particle;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("Group index {0} is out of bounds")]
    GroupOutOfBounds(usize),
    #[error("Cannot enroll empty group '{0}'")]
    EmptyGroup(String),
}

/// Which of the two coordinate sets an energy evaluation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The committed configuration of the Markov chain.
    Current,
    /// The trial configuration of the in-flight move.
    Trial,
}

/// Simulation state: geometry, particle collection and group bookkeeping.
///
/// The particle vector is mirrored by a trial vector of identical layout.
/// Moves write proposed coordinates into the trial buffer, energy evaluation
/// reads whichever [`Frame`] it is asked for, and `commit`/`restore` bring
/// the two buffers back in sync after the Metropolis decision. Outside an
/// in-flight trial both buffers are identical.
#[derive(Debug, Clone)]
pub struct Space {
    pub geometry: Geometry,
    pub particles: Vec<Particle>,
    pub trial: Vec<Particle>,
    pub groups: Vec<Group>,
}

impl Space {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            particles: Vec::new(),
            trial: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn frame(&self, frame: Frame) -> &[Particle] {
        match frame {
            Frame::Current => &self.particles,
            Frame::Trial => &self.trial,
        }
    }

    /// Appends a new contiguous group of particles and returns its index.
    pub fn enroll(
        &mut self,
        name: &str,
        kind: GroupKind,
        particles: Vec<Particle>,
    ) -> Result<usize, SpaceError> {
        if particles.is_empty() {
            return Err(SpaceError::EmptyGroup(name.to_string()));
        }
        let start = self.particles.len();
        let range = start..start + particles.len();
        self.trial.extend(particles.iter().cloned());
        self.particles.extend(particles);
        self.groups.push(Group::new(name, kind, range));
        let index = self.groups.len() - 1;
        let cm = self.mass_center(Frame::Current, index);
        let group = &mut self.groups[index];
        group.cm = cm;
        group.cm_trial = cm;
        Ok(index)
    }

    pub fn group(&self, index: usize) -> Result<&Group, SpaceError> {
        self.groups.get(index).ok_or(SpaceError::GroupOutOfBounds(index))
    }

    /// Group owning a particle index, if any.
    pub fn group_of(&self, particle_index: usize) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(particle_index))
    }

    /// Copies trial coordinates into the committed configuration for the
    /// given particle indices.
    pub fn commit(&mut self, indices: impl IntoIterator<Item = usize>) {
        for i in indices {
            self.particles[i] = self.trial[i].clone();
        }
    }

    /// Discards trial coordinates for the given particle indices, restoring
    /// exactly the committed configuration.
    pub fn restore(&mut self, indices: impl IntoIterator<Item = usize>) {
        for i in indices {
            self.trial[i] = self.particles[i].clone();
        }
    }

    /// Commits a whole group, including its mass-center cache.
    pub fn commit_group(&mut self, index: usize) {
        let range = self.groups[index].range.clone();
        self.commit(range);
        let group = &mut self.groups[index];
        group.cm = group.cm_trial;
    }

    /// Restores a whole group, including its mass-center cache.
    pub fn restore_group(&mut self, index: usize) {
        let range = self.groups[index].range.clone();
        self.restore(range);
        let group = &mut self.groups[index];
        group.cm_trial = group.cm;
    }

    pub fn commit_all(&mut self) {
        self.particles = self.trial.clone();
        for group in &mut self.groups {
            group.cm = group.cm_trial;
        }
    }

    pub fn restore_all(&mut self) {
        self.trial = self.particles.clone();
        for group in &mut self.groups {
            group.cm_trial = group.cm;
        }
    }

    /// Boundary-aware mass center of a group.
    ///
    /// Accumulates minimum-image offsets relative to the group's first
    /// particle so molecules straddling a periodic boundary get a sensible
    /// center, then wraps the result into the cell.
    pub fn mass_center(&self, frame: Frame, group_index: usize) -> Point3<f64> {
        let group = &self.groups[group_index];
        let particles = self.frame(frame);
        let reference = particles[group.range.start].position;
        let mut offset = Vector3::zeros();
        for i in group.range.clone() {
            offset += self.geometry.vdist(&particles[i].position, &reference);
        }
        let mut cm = reference + offset / group.len() as f64;
        self.geometry.boundary(&mut cm);
        cm
    }

    /// Recomputes and caches both mass centers of a group.
    pub fn update_mass_center(&mut self, group_index: usize) {
        let cm = self.mass_center(Frame::Current, group_index);
        let cm_trial = self.mass_center(Frame::Trial, group_index);
        let group = &mut self.groups[group_index];
        group.cm = cm;
        group.cm_trial = cm_trial;
    }

    /// Inserts particles at the end of a group, shifting the ranges of all
    /// later groups. Both coordinate buffers receive the new particles.
    pub fn insert_particles(
        &mut self,
        group_index: usize,
        particles: &[Particle],
    ) -> Result<std::ops::Range<usize>, SpaceError> {
        if group_index >= self.groups.len() {
            return Err(SpaceError::GroupOutOfBounds(group_index));
        }
        let at = self.groups[group_index].range.end;
        let n = particles.len();
        for (offset, particle) in particles.iter().enumerate() {
            self.particles.insert(at + offset, particle.clone());
            self.trial.insert(at + offset, particle.clone());
        }
        self.groups[group_index].range.end += n;
        for group in &mut self.groups[group_index + 1..] {
            group.range.start += n;
            group.range.end += n;
        }
        Ok(at..at + n)
    }

    /// Removes particles by index from a group, keeping ranges contiguous.
    /// Indices may be given in any order.
    pub fn remove_particles(
        &mut self,
        group_index: usize,
        indices: &[usize],
    ) -> Result<(), SpaceError> {
        if group_index >= self.groups.len() {
            return Err(SpaceError::GroupOutOfBounds(group_index));
        }
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &i in sorted.iter().rev() {
            self.particles.remove(i);
            self.trial.remove(i);
        }
        let n = sorted.len();
        self.groups[group_index].range.end -= n;
        for group in &mut self.groups[group_index + 1..] {
            group.range.start -= n;
            group.range.end -= n;
        }
        Ok(())
    }
}
