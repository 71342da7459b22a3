use nalgebra::Point3;
use rand::Rng;
use std::ops::Range;

/// How a group responds to volume scaling and cluster moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Independent particles (salt, free ions): every particle coordinate is
    /// rescaled on volume change.
    Atomic,
    /// A rigid or bonded molecular unit: internal distances are preserved on
    /// volume change by rescaling the mass center only.
    Molecular,
}

/// A contiguous index range into the particle collection, representing a
/// molecule or a species subset.
///
/// Groups own a mass-center cache for the committed and the trial
/// configuration. Moves that act on molecular units update `cm_trial` while
/// proposing and the caches are swapped on commit/restore together with the
/// particle coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub kind: GroupKind,
    pub range: Range<usize>,
    /// Mass center of the committed configuration.
    pub cm: Point3<f64>,
    /// Mass center of the trial configuration.
    pub cm_trial: Point3<f64>,
}

impl Group {
    pub fn new(name: &str, kind: GroupKind, range: Range<usize>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            range,
            cm: Point3::origin(),
            cm_trial: Point3::origin(),
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range.contains(&index)
    }

    /// Picks a uniformly random particle index from the group.
    ///
    /// Panics on an empty group; a move drawing from an empty group is a
    /// configuration error caught before this point.
    pub fn random_index(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(self.range.clone())
    }
}
