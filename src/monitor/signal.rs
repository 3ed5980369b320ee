//! Señal de velocidad simulada
//!
//! Paseo aleatorio acotado: la primera lectura es uniforme en [0, 30) y cada
//! lectura siguiente suma un delta entero uniforme en [-10, 10], recortado
//! a [0, max_speed].

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fuente de lecturas de velocidad
pub trait SpeedSignal: Send {
    /// Siguiente velocidad en km/h
    fn next_speed(&mut self) -> u32;

    /// Reiniciar la señal al empezar una sesión nueva
    fn reset(&mut self);
}

/// Paseo aleatorio acotado
pub struct RandomWalkSignal<R: Rng + Send> {
    rng: R,
    last: Option<u32>,
    max_speed: u32,
}

impl RandomWalkSignal<StdRng> {
    /// Señal con semilla fija, reproducible
    pub fn seeded(seed: u64, max_speed: u32) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), max_speed)
    }

    /// Señal con semilla de entropía del sistema
    pub fn from_entropy(max_speed: u32) -> Self {
        Self::with_rng(StdRng::from_entropy(), max_speed)
    }
}

impl<R: Rng + Send> RandomWalkSignal<R> {
    pub fn with_rng(rng: R, max_speed: u32) -> Self {
        Self {
            rng,
            last: None,
            max_speed,
        }
    }
}

impl<R: Rng + Send> SpeedSignal for RandomWalkSignal<R> {
    fn next_speed(&mut self) -> u32 {
        let next = match self.last {
            None => self.rng.gen_range(0..30),
            Some(prev) => {
                let delta: i64 = self.rng.gen_range(-10..=10);
                (prev as i64 + delta).clamp(0, self.max_speed as i64) as u32
            }
        };
        self.last = Some(next);
        next
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

/// Señal con valores predefinidos; repite el último cuando se agota
#[derive(Debug, Clone, Default)]
pub struct ScriptedSignal {
    script: Vec<u32>,
    pending: VecDeque<u32>,
    last: u32,
}

impl ScriptedSignal {
    pub fn new(script: impl IntoIterator<Item = u32>) -> Self {
        let script: Vec<u32> = script.into_iter().collect();
        Self {
            pending: script.iter().copied().collect(),
            script,
            last: 0,
        }
    }
}

impl SpeedSignal for ScriptedSignal {
    fn next_speed(&mut self) -> u32 {
        if let Some(next) = self.pending.pop_front() {
            self.last = next;
        }
        self.last
    }

    fn reset(&mut self) {
        self.pending = self.script.iter().copied().collect();
        self.last = 0;
    }
}
