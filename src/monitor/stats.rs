//! Estadísticas de una sesión de monitoreo

use std::collections::VecDeque;

use serde::Serialize;

use crate::models::SpeedReading;

/// Máximo, mínimo y media de todas las lecturas de la sesión, más una
/// ventana con las lecturas más recientes
#[derive(Debug, Clone)]
pub struct SessionStats {
    window: VecDeque<SpeedReading>,
    window_size: usize,
    count: u64,
    sum: u64,
    max: u32,
    min: Option<u32>,
    overspeed_count: u64,
}

/// Resumen serializable de una sesión
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub readings: u64,
    pub max_speed: u32,
    pub min_speed: u32,
    pub avg_speed: u32,
    pub overspeed_readings: u64,
    pub citations_issued: u32,
}

impl SessionStats {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            count: 0,
            sum: 0,
            max: 0,
            min: None,
            overspeed_count: 0,
        }
    }

    pub fn record(&mut self, reading: SpeedReading, overspeeding: bool) {
        self.count += 1;
        self.sum += reading.speed as u64;
        self.max = self.max.max(reading.speed);
        self.min = Some(self.min.map_or(reading.speed, |m| m.min(reading.speed)));
        if overspeeding {
            self.overspeed_count += 1;
        }

        if self.window_size > 0 {
            if self.window.len() == self.window_size {
                self.window.pop_front();
            }
            self.window.push_back(reading);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window_size);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn min(&self) -> u32 {
        self.min.unwrap_or(0)
    }

    /// Media redondeada al entero más cercano
    pub fn average(&self) -> u32 {
        if self.count == 0 {
            0
        } else {
            ((self.sum as f64) / (self.count as f64)).round() as u32
        }
    }

    pub fn overspeed_count(&self) -> u64 {
        self.overspeed_count
    }

    pub fn history(&self) -> impl Iterator<Item = &SpeedReading> {
        self.window.iter()
    }

    pub fn summary(&self, citations_issued: u32) -> SessionSummary {
        SessionSummary {
            readings: self.count,
            max_speed: self.max,
            min_speed: self.min(),
            avg_speed: self.average(),
            overspeed_readings: self.overspeed_count,
            citations_issued,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = SessionStats::new(20);
        for speed in [10, 30, 20, 85] {
            stats.record(SpeedReading::new(speed), speed > 80);
        }
        assert_eq!(stats.count(), 4);
        assert_eq!(stats.max(), 85);
        assert_eq!(stats.min(), 10);
        assert_eq!(stats.average(), 36);
        assert_eq!(stats.overspeed_count(), 1);
    }

    #[test]
    fn test_window_keeps_most_recent() {
        let mut stats = SessionStats::new(20);
        for speed in 0..25 {
            stats.record(SpeedReading::new(speed), false);
        }
        let speeds: Vec<u32> = stats.history().map(|r| r.speed).collect();
        assert_eq!(speeds.len(), 20);
        assert_eq!(speeds.first(), Some(&5));
        assert_eq!(speeds.last(), Some(&24));
        assert_eq!(stats.count(), 25);
    }

    #[test]
    fn test_max_is_monotonic_and_reset_clears() {
        let mut stats = SessionStats::new(5);
        let mut last_max = 0;
        for speed in [50, 20, 70, 10, 60] {
            stats.record(SpeedReading::new(speed), false);
            assert!(stats.max() >= last_max);
            last_max = stats.max();
        }
        stats.reset();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.max(), 0);
        assert_eq!(stats.average(), 0);
        assert_eq!(stats.history().count(), 0);
    }
}
