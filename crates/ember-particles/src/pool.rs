//! Live particle set plus a free list of recycled particles

use crate::neighbors::Neighbors;
use crate::particle::Particle;
use std::time::{Duration, Instant};

/// Owns every particle of a system: the live set in stable order and a free
/// list that spawning draws from before allocating.
pub struct ParticlePool<D = ()> {
    live: Vec<Particle<D>>,
    free: Vec<Particle<D>>,
    /// Particles removed by the current reclaim, waiting for their death call
    graveyard: Vec<Particle<D>>,
}

impl<D> Default for ParticlePool<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> ParticlePool<D> {
    pub fn new() -> Self {
        Self {
            live: Vec::new(),
            free: Vec::new(),
            graveyard: Vec::new(),
        }
    }

    pub fn alive_count(&self) -> usize {
        self.live.len()
    }

    /// Number of recycled particles ready for reuse
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Spawn one particle, reusing a recycled one when available.
    /// The particle is reset and starts its lifetime at `now`.
    pub fn spawn(&mut self, now: Instant, lifetime: Duration) -> &mut Particle<D> {
        let mut p = self.free.pop().unwrap_or_else(|| Particle::new(now));
        p.reset();
        p.begin(now, lifetime);
        self.live.push(p);
        let idx = self.live.len() - 1;
        &mut self.live[idx]
    }

    /// Removes particles that are no longer alive at `now`, calls `on_death`
    /// for each of them and returns them to the free list.
    /// Returns how many particles were reclaimed.
    pub fn reclaim<F>(&mut self, now: Instant, on_death: F) -> usize
    where
        F: FnMut(&mut Particle<D>, &Neighbors<'_, D>),
    {
        self.reclaim_where(|p| !p.is_alive(now), on_death)
    }

    /// Kills and reclaims every live particle
    pub fn reclaim_all<F>(&mut self, on_death: F) -> usize
    where
        F: FnMut(&mut Particle<D>, &Neighbors<'_, D>),
    {
        for p in &mut self.live {
            p.kill();
        }
        self.reclaim_where(|_| true, on_death)
    }

    fn reclaim_where<P, F>(&mut self, is_dead: P, mut on_death: F) -> usize
    where
        P: Fn(&Particle<D>) -> bool,
        F: FnMut(&mut Particle<D>, &Neighbors<'_, D>),
    {
        // Stable partition: survivors keep their relative order
        let mut write = 0;
        for read in 0..self.live.len() {
            if !is_dead(&self.live[read]) {
                self.live.swap(write, read);
                write += 1;
            }
        }
        self.graveyard.extend(self.live.drain(write..));

        let count = self.graveyard.len();
        // Death calls happen only once every dead particle has left the live set
        for mut p in self.graveyard.drain(..) {
            on_death(&mut p, &Neighbors::all(&self.live));
            // Caller data is released now, not when the slot is reused
            p.data = None;
            self.free.push(p);
        }
        count
    }

    /// Access alive particles for reading, in live-set order
    pub fn alive_slice(&self) -> &[Particle<D>] {
        &self.live
    }

    /// Access alive particles mutably
    pub fn alive_slice_mut(&mut self) -> &mut [Particle<D>] {
        &mut self.live
    }
}
