//! # Memory Report
//!
//! Drives a particle pool and a per-frame scratch stack through a few
//! simulated frames, then prints the registry snapshot that a profiler
//! panel would display.
//!
//! ```bash
//! # Default configuration
//! cargo run --features report --bin memory_report
//!
//! # Custom configuration, per-allocation logging
//! RUST_LOG=debug cargo run --features report --bin memory_report -- crates/tessera_memory/config/memory.toml
//! ```

use std::process::ExitCode;

use tessera_memory::{
    MemoryConfig, MemoryManager, MemoryResult, PoolAllocator, PoolHandle, StackAllocator,
};
use tracing_subscriber::EnvFilter;

/// Simulated frames.
const FRAMES: u16 = 4;
/// Particles spawned each frame.
const SPAWN_PER_FRAME: u16 = 12;
/// Seconds per frame.
const DELTA_TIME: f32 = 1.0 / 60.0;

/// A pooled particle.
#[derive(Debug)]
struct Particle {
    position: [f32; 3],
    velocity: [f32; 3],
    life: f32,
}

impl Particle {
    fn spawn(seed: u16) -> Self {
        let s = f32::from(seed);
        Self {
            position: [0.0, 0.0, 0.0],
            velocity: [s * 0.5, 1.0 + s * 0.1, -s * 0.25],
            life: DELTA_TIME * f32::from(1 + seed % 3),
        }
    }

    fn step(&mut self, dt: f32) -> bool {
        for (p, v) in self.position.iter_mut().zip(self.velocity) {
            *p += v * dt;
        }
        self.life -= dt;
        self.life > 0.0
    }

    fn distance(&self) -> f32 {
        self.position.iter().map(|p| p * p).sum::<f32>().sqrt()
    }
}

fn run(config: &MemoryConfig) -> MemoryResult<()> {
    let manager = MemoryManager::from_config(config);
    let mut particles: PoolAllocator<Particle> =
        PoolAllocator::from_config(&manager, "Particles", config)?;
    let mut scratch = StackAllocator::from_config(&manager, "Frame Scratch", config)?;

    let mut live: Vec<PoolHandle> = Vec::new();

    for frame in 0..FRAMES {
        for i in 0..SPAWN_PER_FRAME {
            live.push(particles.create(Particle::spawn(frame * SPAWN_PER_FRAME + i)));
        }

        // Per-frame scratch: distances of every live particle
        let distances = scratch.allocate_pod::<f32>(live.len())?;
        let mut expired = Vec::new();
        {
            let out = scratch.cast_slice_mut::<f32>(&distances)?;
            for (slot, handle) in out.iter_mut().zip(&live) {
                if let Some(particle) = particles.get_mut(*handle) {
                    if !particle.step(DELTA_TIME) {
                        expired.push(*handle);
                    }
                    *slot = particle.distance();
                }
            }
        }
        let furthest = scratch
            .cast_slice::<f32>(&distances)?
            .iter()
            .copied()
            .fold(0.0_f32, f32::max);

        for handle in &expired {
            particles.delete(*handle);
        }
        live.retain(|handle| !expired.contains(handle));

        tracing::info!(
            frame,
            live = live.len(),
            scratch_used = scratch.used_size(),
            "Frame complete, furthest particle at {furthest:.3}"
        );

        scratch.deallocate(distances);
    }

    let report = manager.report();
    println!("{report}");

    if report.is_over_budget() {
        tracing::warn!(
            "Reserved memory is {:.1}% of the application budget",
            report.budget_usage_percent()
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MemoryConfig::from_file(path),
        None => Ok(MemoryConfig::default()),
    };

    match config.and_then(|config| run(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
