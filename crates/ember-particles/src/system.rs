//! The particle system: emission accounting and the multi-pass update loop

use crate::behavior::Behaviors;
use crate::neighbors::Neighbors;
use crate::particle::{Particle, ParticleInstance};
use crate::pool::ParticlePool;
use ember_core::{NormalizedDuration, Vec2};
use log::{debug, trace, warn};
use std::time::{Duration, Instant};

/// Lifetime of spawned particles when `lifetime_over_time` is unset
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(1);

/// Upper bound on reclaim/spawn/advance passes within one update
pub const MAX_PASSES_PER_UPDATE: usize = 1024;

/// Simulates a number of particles, customized by [`Behaviors`].
///
/// Particle positions are relative to the system's origin, so the system keeps
/// its own frame of reference. A host moves the whole effect by drawing it at
/// a different origin.
pub struct ParticleSystem<D = ()> {
    /// Maximum number of particles alive at a time. Spawns beyond it are dropped.
    pub max_particles: usize,
    pub behaviors: Behaviors<D>,
    pool: ParticlePool<D>,
    /// Set by the first update, cleared by `reset`
    start_time: Option<Instant>,
    last_update_time: Option<Instant>,
    /// Fractional number of particles owed to spawning
    particles_to_emit: f64,
}

impl<D> ParticleSystem<D> {
    pub fn new(max_particles: usize) -> Self {
        Self {
            max_particles,
            behaviors: Behaviors::default(),
            pool: ParticlePool::new(),
            start_time: None,
            last_update_time: None,
            particles_to_emit: 0.0,
        }
    }

    /// Advances the system to `now`, usually the current frame's time.
    ///
    /// Dead particles are reclaimed, new ones spawned and every live particle
    /// advanced, repeatedly, until a pass ends with no particle dead. A particle
    /// that dies during its own advance is therefore removed, and its slot
    /// refilled, before this returns.
    pub fn update(&mut self, now: Instant) {
        if self.start_time.is_none() {
            debug!("particle system started");
            self.start_time = Some(now);
            self.last_update_time = Some(now);
        }

        let age = self.duration(now);
        let delta = self.frame_delta(now);

        let mut passes = 0;
        loop {
            passes += 1;
            let reclaimed = self.remove_dead_particles(now);
            let spawned = self.spawn_particles(now, age, delta);
            let needs_more_passes = self.update_particles(now);
            trace!(
                "pass {passes}: reclaimed {reclaimed}, spawned {spawned}, alive {}",
                self.pool.alive_count()
            );

            if !needs_more_passes {
                break;
            }
            if passes >= MAX_PASSES_PER_UPDATE {
                warn!(
                    "update did not settle after {passes} passes, {} particle(s) still dying",
                    self.pool.alive_count()
                );
                break;
            }
        }

        self.last_update_time = Some(now);
    }

    /// Queues `count` particles for spawning on the next update, regardless of
    /// the emission rate. They are still subject to `max_particles`.
    pub fn spawn(&mut self, count: usize) {
        self.particles_to_emit += count as f64;
    }

    fn remove_dead_particles(&mut self, now: Instant) -> usize {
        let death_func = &mut self.behaviors.death_func;
        self.pool.reclaim(now, |p, neighbors| {
            if let Some(f) = death_func.as_mut() {
                f(p, neighbors);
            }
        })
    }

    fn spawn_particles(&mut self, now: Instant, age: Duration, delta: Duration) -> usize {
        if !delta.is_zero() {
            if let Some(rate) = self.behaviors.emission_rate_over_time.as_mut() {
                let owed = rate(age, delta) * delta.as_secs_f64();
                if owed.is_finite() {
                    self.particles_to_emit += owed;
                } else {
                    warn!("ignoring non-finite emission ({owed})");
                }
            }
        }

        let mut spawned = 0;
        while self.particles_to_emit >= 1.0 {
            if self.pool.alive_count() >= self.max_particles {
                // Every remaining spawn would be dropped, and dropped spawns
                // are still consumed
                self.particles_to_emit = self.particles_to_emit.fract();
                break;
            }
            self.spawn_particle(now, age, delta);
            spawned += 1;
            self.particles_to_emit -= 1.0;
        }
        spawned
    }

    fn spawn_particle(&mut self, now: Instant, age: Duration, delta: Duration) {
        let lifetime = match self.behaviors.lifetime_over_time.as_mut() {
            Some(f) => f(age, delta),
            None => DEFAULT_LIFETIME,
        };
        let position = match self.behaviors.emission_position_over_time.as_mut() {
            Some(f) => f(age, delta),
            None => Vec2::ZERO,
        };

        let p = self.pool.spawn(now, lifetime);
        p.position = position;
    }

    /// Advances every live particle. Returns true if any of them is dead afterwards.
    fn update_particles(&mut self, now: Instant) -> bool {
        let live = self.pool.alive_slice_mut();
        let mut needs_more_passes = false;

        for i in 0..live.len() {
            let (before, rest) = live.split_at_mut(i);
            let Some((particle, after)) = rest.split_first_mut() else {
                break;
            };

            particle.advance(now, &mut self.behaviors, &Neighbors::new(before, after));

            if !particle.is_alive(now) {
                needs_more_passes = true;
            }
        }
        needs_more_passes
    }

    /// Calls `visitor` for each live particle with its normalized age at `now`
    /// and the time since the last update.
    pub fn for_each_particle<F>(&self, now: Instant, mut visitor: F)
    where
        F: FnMut(&Particle<D>, NormalizedDuration, Duration),
    {
        let delta = self.frame_delta(now);
        for p in self.pool.alive_slice() {
            visitor(p, p.normalized_age(now), delta);
        }
    }

    /// Live particles in iteration order
    pub fn particles(&self) -> impl Iterator<Item = &Particle<D>> {
        self.pool.alive_slice().iter()
    }

    /// Packs one GPU instance per live particle into `out`, replacing its contents
    pub fn pack_instances(&self, now: Instant, out: &mut Vec<ParticleInstance>) {
        out.clear();
        out.extend(
            self.pool
                .alive_slice()
                .iter()
                .map(|p| ParticleInstance::from_particle(p, p.normalized_age(now))),
        );
    }

    /// Number of alive particles
    pub fn num_particles(&self) -> usize {
        self.pool.alive_count()
    }

    /// How long the system has been running at `now`; zero before the first update
    pub fn duration(&self, now: Instant) -> Duration {
        match self.start_time {
            Some(start) => now.saturating_duration_since(start),
            None => Duration::ZERO,
        }
    }

    /// Fractional number of particles still owed to spawning
    pub fn pending_emission(&self) -> f64 {
        self.particles_to_emit
    }

    fn frame_delta(&self, now: Instant) -> Duration {
        match self.last_update_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        }
    }

    /// Kills all alive particles and returns the system to its state before
    /// the first update. `death_func` is called for every particle that was
    /// alive; the behaviors themselves are kept.
    pub fn reset(&mut self) {
        let death_func = &mut self.behaviors.death_func;
        let killed = self.pool.reclaim_all(|p, neighbors| {
            if let Some(f) = death_func.as_mut() {
                f(p, neighbors);
            }
        });
        debug!("particle system reset, {killed} particle(s) killed");

        self.start_time = None;
        self.last_update_time = None;
        self.particles_to_emit = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{constant, constant_duration};
    use ember_core::Color;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn inert_until_first_update() {
        let s = ParticleSystem::<()>::new(10);
        let now = Instant::now();
        assert_eq!(s.num_particles(), 0);
        assert_eq!(s.duration(now + SECOND), Duration::ZERO);
    }

    #[test]
    fn start_time_is_set_once() {
        let mut s = ParticleSystem::<()>::new(10);
        let now = Instant::now();
        s.update(now);
        s.update(now + SECOND);
        s.update(now + 2 * SECOND);
        assert_eq!(s.duration(now + 3 * SECOND), 3 * SECOND);
    }

    #[test]
    fn spawn_honors_capacity() {
        let mut s = ParticleSystem::<()>::new(5);
        s.spawn(3);
        s.spawn(9);
        s.update(Instant::now());
        assert_eq!(s.num_particles(), 5);
        // Blocked spawns are not queued for later
        assert!(s.pending_emission() < 1.0);
    }

    #[test]
    fn huge_spawn_request_is_capped_quickly() {
        let mut s = ParticleSystem::<()>::new(3);
        s.spawn(1 << 54);
        s.update(Instant::now());
        assert_eq!(s.num_particles(), 3);
        assert_eq!(s.pending_emission(), 0.0);
    }

    #[test]
    fn huge_emission_rate_is_capped_quickly() {
        let mut s = ParticleSystem::<()>::new(4);
        s.behaviors
            .set_emission_rate_over_time(constant(1e300))
            .set_lifetime_over_time(constant_duration(Duration::from_secs(10)));
        let now = Instant::now();
        s.update(now);
        s.update(now + Duration::from_millis(16));
        assert_eq!(s.num_particles(), 4);
        assert!(s.pending_emission() < 1.0);
    }

    #[test]
    fn zero_capacity_never_spawns() {
        let mut s = ParticleSystem::<()>::new(0);
        s.behaviors.set_emission_rate_over_time(constant(100.0));
        s.spawn(4);
        let now = Instant::now();
        s.update(now);
        s.update(now + SECOND);
        assert_eq!(s.num_particles(), 0);
    }

    #[test]
    fn no_emission_on_first_update() {
        let mut s = ParticleSystem::<()>::new(10);
        s.behaviors.set_emission_rate_over_time(constant(10.0));
        let now = Instant::now();
        s.update(now);
        assert_eq!(s.num_particles(), 0);
        s.update(now + Duration::from_millis(500));
        assert_eq!(s.num_particles(), 5);
    }

    #[test]
    fn fractional_emission_accumulates() {
        let mut s = ParticleSystem::<()>::new(100);
        s.behaviors
            .set_emission_rate_over_time(constant(1.0))
            .set_lifetime_over_time(constant_duration(Duration::from_secs(100)));
        let mut now = Instant::now();
        s.update(now);
        for _ in 0..9 {
            now += Duration::from_millis(250);
            s.update(now);
        }
        // 2.25 seconds at one particle per second
        assert_eq!(s.num_particles(), 2);
        assert!((s.pending_emission() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn particle_update_full_lifecycle() {
        let mut s = ParticleSystem::<&'static str>::new(1);

        let update_called = Rc::new(Cell::new(false));
        let death_called = Rc::new(Cell::new(false));
        let update_flag = update_called.clone();
        let death_flag = death_called.clone();

        s.behaviors
            .set_emission_rate_over_time(constant(10.0))
            .set_lifetime_over_time(constant_duration(Duration::from_millis(1500)))
            .set_data_over_lifetime(|_, _, _| Some("data"))
            .set_emission_position_over_time(|_, _| Vec2::new(17.0, 23.0))
            .set_velocity_over_lifetime(|_, _, _, _| Vec2::new(3.0, 5.0))
            .set_scale_over_lifetime(|_, _, _, _| Vec2::new(7.0, 11.0))
            .set_color_over_lifetime(|_, _, _, _| Color::from_rgba8(0x12, 0x23, 0x34, 0x45))
            .set_rotation_over_lifetime(|_, _, _, _| 0.123)
            .set_update_func(move |_, _, _, _| update_flag.set(true))
            .set_death_func(move |_, _| death_flag.set(true));

        let mut now = Instant::now();
        s.update(now);
        now += SECOND;
        s.update(now);

        let p = s.particles().next().unwrap();
        assert_eq!(p.data(), Some(&"data"));
        // Spawned this frame, so not moved yet
        assert_eq!(p.position(), Vec2::new(17.0, 23.0));
        assert_eq!(p.velocity(), Vec2::new(3.0, 5.0));
        assert_eq!(p.scale(), Vec2::new(7.0, 11.0));
        assert_eq!(p.color(), Color::from_rgba8(0x12, 0x23, 0x34, 0x45));
        assert_eq!(p.angle(), 0.0);
        assert_eq!(p.lifetime(), Duration::from_millis(1500));
        assert!(update_called.get());

        now += SECOND;
        s.update(now);

        let p = s.particles().next().unwrap();
        assert_eq!(p.position(), Vec2::new(20.0, 28.0));
        assert_eq!(p.angle(), 0.123);
        assert!(!death_called.get());

        now += SECOND;
        s.update(now);

        assert!(death_called.get());
    }

    #[test]
    fn killed_particle_is_removed() {
        let mut s = ParticleSystem::<()>::new(1);
        let spawn_more = Rc::new(Cell::new(true));
        let spawn_flag = spawn_more.clone();
        s.behaviors
            .set_emission_rate_over_time(move |_, _| if spawn_flag.get() { 10.0 } else { 0.0 })
            .set_lifetime_over_time(constant_duration(Duration::from_secs(10)));

        let mut now = Instant::now();
        s.update(now);
        now += SECOND;
        s.update(now);
        assert_eq!(s.num_particles(), 1);

        s.pool.alive_slice_mut()[0].kill();
        spawn_more.set(false);
        now += SECOND;
        s.update(now);

        assert_eq!(s.num_particles(), 0);
    }

    #[test]
    fn spawn_more_after_kill() {
        let mut s = ParticleSystem::<()>::new(1);
        let kill_called = Rc::new(Cell::new(false));
        let deaths = Rc::new(Cell::new(0));
        let kill_flag = kill_called.clone();
        let death_count = deaths.clone();

        s.behaviors
            .set_emission_rate_over_time(constant(10.0))
            .set_lifetime_over_time(constant_duration(Duration::from_secs(10)))
            .set_update_func(move |p, t, _, _| {
                if t.value() > 0.0 {
                    kill_flag.set(true);
                    p.kill();
                }
            })
            .set_death_func(move |_, _| death_count.set(death_count.get() + 1));

        let mut now = Instant::now();
        s.update(now);
        now += SECOND;
        s.update(now);

        assert_eq!(s.num_particles(), 1);
        assert!(!kill_called.get());

        now += SECOND;
        s.update(now);

        // Killed and replaced within the same update, never above capacity
        assert_eq!(s.num_particles(), 1);
        assert!(kill_called.get());
        assert_eq!(deaths.get(), 1);
        assert_eq!(s.particles().next().unwrap().birth_time(), now);
    }

    #[test]
    fn dying_particle_gets_final_update() {
        let mut s = ParticleSystem::<()>::new(1);
        let last_seen = Rc::new(Cell::new(Vec2::ZERO));
        let seen = last_seen.clone();

        s.behaviors
            .set_lifetime_over_time(constant_duration(Duration::from_secs(10)))
            .set_velocity_over_lifetime(|_, _, _, _| Vec2::new(1.0, 0.0))
            .set_update_func(|p, t, _, _| {
                if t.value() >= 0.5 {
                    p.kill();
                }
            })
            .set_death_func(move |p, _| seen.set(p.position()));

        let mut now = Instant::now();
        s.spawn(1);
        s.update(now);
        now += Duration::from_secs(5);
        s.update(now);

        assert_eq!(s.num_particles(), 0);
        // The killing pass still integrated position
        assert_eq!(last_seen.get(), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn reset_clears_state() {
        let mut s = ParticleSystem::<()>::new(10);
        let deaths = Rc::new(Cell::new(0));
        let death_count = deaths.clone();
        s.behaviors
            .set_lifetime_over_time(constant_duration(Duration::from_secs(10)))
            .set_death_func(move |_, _| death_count.set(death_count.get() + 1));

        let now = Instant::now();
        s.spawn(4);
        s.update(now);
        s.update(now + SECOND);
        s.spawn(3);
        assert_eq!(s.num_particles(), 4);

        s.reset();

        assert_eq!(s.num_particles(), 0);
        assert_eq!(deaths.get(), 4);
        assert_eq!(s.pending_emission(), 0.0);
        assert_eq!(s.duration(now + 2 * SECOND), Duration::ZERO);
        assert!(s.behaviors.death_func.is_some());

        // Re-armed: the next update restarts the clock
        let later = now + Duration::from_secs(60);
        s.update(later);
        assert_eq!(s.duration(later + SECOND), SECOND);
    }

    #[test]
    fn death_func_runs_after_removal() {
        let mut s = ParticleSystem::<u32>::new(10);
        let observed = Rc::new(RefCell::new(Vec::new()));
        let log = observed.clone();

        let mut next_id = 0;
        s.behaviors
            .set_lifetime_over_time(|_, _| Duration::from_secs(1))
            .set_data_over_lifetime(move |old, _, _| {
                old.or_else(|| {
                    next_id += 1;
                    Some(next_id)
                })
            })
            .set_death_func(move |p, neighbors| {
                let id = p.data().copied();
                let still_listed = neighbors.iter().any(|n| n.data().copied() == id);
                log.borrow_mut().push((neighbors.len(), still_listed));
            });

        let now = Instant::now();
        s.spawn(3);
        s.update(now);
        assert_eq!(s.num_particles(), 3);

        s.update(now + 2 * SECOND);

        assert_eq!(s.num_particles(), 0);
        assert_eq!(*observed.borrow(), vec![(0, false); 3]);
    }

    #[test]
    fn neighbors_exclude_self() {
        let mut s = ParticleSystem::<()>::new(10);
        let counts = Rc::new(RefCell::new(Vec::new()));
        let record = counts.clone();
        s.behaviors.set_velocity_over_lifetime(move |p, _, _, neighbors| {
            record.borrow_mut().push(neighbors.len());
            // Cohesion towards the neighbors' mean position
            let n = neighbors.len().max(1) as f64;
            let sum = neighbors
                .iter()
                .fold(Vec2::ZERO, |acc, other| acc + other.position());
            sum * (1.0 / n) - p.position()
        });

        s.spawn(4);
        s.update(Instant::now());
        assert_eq!(*counts.borrow(), vec![3, 3, 3, 3]);
    }

    #[test]
    fn for_each_particle_reports_fresh_age() {
        let mut s = ParticleSystem::<()>::new(10);
        s.behaviors
            .set_lifetime_over_time(constant_duration(Duration::from_secs(4)));

        let now = Instant::now();
        s.spawn(2);
        s.update(now);

        let mut visits = Vec::new();
        s.for_each_particle(now + SECOND, |_, t, delta| visits.push((t.value(), delta)));

        assert_eq!(visits.len(), 2);
        for (t, delta) in visits {
            assert!((t - 0.25).abs() < 1e-9);
            assert_eq!(delta, SECOND);
        }
    }

    #[test]
    fn pack_instances_matches_particles() {
        let mut s = ParticleSystem::<()>::new(10);
        s.behaviors
            .set_emission_position_over_time(|_, _| Vec2::new(4.0, -2.0))
            .set_scale_over_lifetime(|_, _, _, _| Vec2::new(0.5, 2.0));

        let now = Instant::now();
        s.spawn(3);
        s.update(now);

        let mut instances = vec![ParticleInstance::from_particle(
            s.particles().next().unwrap(),
            NormalizedDuration::START,
        ); 8];
        s.pack_instances(now, &mut instances);

        assert_eq!(instances.len(), 3);
        for inst in &instances {
            assert_eq!(inst.pos_scale, [4.0, -2.0, 0.5, 2.0]);
            assert_eq!(inst.color, [1.0, 1.0, 1.0, 1.0]);
        }
    }

    #[test]
    fn behaviors_can_be_swapped_between_updates() {
        let mut s = ParticleSystem::<()>::new(10);
        s.behaviors
            .set_lifetime_over_time(constant_duration(Duration::from_secs(10)))
            .set_velocity_over_lifetime(|_, _, _, _| Vec2::new(1.0, 0.0));

        let now = Instant::now();
        s.spawn(1);
        s.update(now);
        s.update(now + SECOND);

        s.behaviors
            .set_velocity_over_lifetime(|_, _, _, _| Vec2::new(0.0, 2.0));
        s.update(now + 2 * SECOND);

        let p = s.particles().next().unwrap();
        assert_eq!(p.position(), Vec2::new(1.0, 2.0));

        s.behaviors.velocity_over_lifetime = None;
        s.update(now + 3 * SECOND);
        // Velocity is kept when the behavior is cleared
        let p = s.particles().next().unwrap();
        assert_eq!(p.position(), Vec2::new(1.0, 4.0));
    }

    #[test]
    fn runaway_deaths_are_bounded() {
        let mut s = ParticleSystem::<()>::new(10);
        s.behaviors
            .set_emission_rate_over_time(constant(10.0))
            .set_lifetime_over_time(constant_duration(Duration::ZERO));

        let now = Instant::now();
        s.update(now);
        s.update(now + SECOND);
        assert!(s.num_particles() <= 10);
    }

    #[test]
    fn backwards_time_is_tolerated() {
        let mut s = ParticleSystem::<()>::new(10);
        s.behaviors.set_emission_rate_over_time(constant(10.0));
        let now = Instant::now() + Duration::from_secs(10);
        s.update(now);
        s.update(now - SECOND);
        assert_eq!(s.num_particles(), 0);
        assert_eq!(s.duration(now - SECOND), Duration::ZERO);
    }
}
