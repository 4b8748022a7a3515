//! Read-only view of the other live particles of a system

use crate::particle::Particle;
use std::iter::Chain;
use std::slice::Iter;

/// The live particles other than the one being visited, in live-set order.
///
/// During an advance pass, particles before the visited one have already been
/// advanced in this pass and particles after it have not.
pub struct Neighbors<'a, D> {
    before: &'a [Particle<D>],
    after: &'a [Particle<D>],
}

impl<'a, D> Neighbors<'a, D> {
    pub(crate) fn new(before: &'a [Particle<D>], after: &'a [Particle<D>]) -> Self {
        Self { before, after }
    }

    /// A view of a whole live set
    pub(crate) fn all(live: &'a [Particle<D>]) -> Self {
        Self {
            before: live,
            after: &[],
        }
    }

    pub fn empty() -> Self {
        Self {
            before: &[],
            after: &[],
        }
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Chain<Iter<'a, Particle<D>>, Iter<'a, Particle<D>>> {
        self.before.iter().chain(self.after.iter())
    }
}

impl<'a, D> IntoIterator for &Neighbors<'a, D> {
    type Item = &'a Particle<D>;
    type IntoIter = Chain<Iter<'a, Particle<D>>, Iter<'a, Particle<D>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
