//! Per-phase timing records

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::Phase;

/// Durations of the phases one operation went through.
///
/// A field is `Some` only if that phase ran. `total` spans the whole
/// operation, so it is never below the sum of the phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseTiming {
    pub open: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
    pub total: Option<Duration>,
}

impl PhaseTiming {
    /// Sum of the phases that ran
    pub fn phase_sum(&self) -> Duration {
        [self.open, self.read, self.write]
            .into_iter()
            .flatten()
            .sum()
    }
}

impl fmt::Display for PhaseTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(open) = self.open {
            writeln!(f, "Time to open file: {:.6} seconds", open.as_secs_f64())?;
        }
        if let Some(read) = self.read {
            writeln!(f, "Time to read table: {:.6} seconds", read.as_secs_f64())?;
        }
        if let Some(write) = self.write {
            writeln!(f, "Time to write file: {:.6} seconds", write.as_secs_f64())?;
        }
        if let Some(total) = self.total {
            write!(f, "Total time: {:.6} seconds", total.as_secs_f64())?;
        }
        Ok(())
    }
}

/// Monotonic clock that marks phase boundaries of one operation
#[derive(Debug)]
pub struct PhaseClock {
    started: Instant,
    timing: PhaseTiming,
}

impl PhaseClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            timing: PhaseTiming::default(),
        }
    }

    /// Run `f` as `phase`, recording its duration only when it succeeds
    pub fn measure<T, E>(
        &mut self,
        phase: Phase,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let phase_start = Instant::now();
        let value = f()?;
        let elapsed = phase_start.elapsed();
        match phase {
            Phase::Open => self.timing.open = Some(elapsed),
            Phase::Read => self.timing.read = Some(elapsed),
            Phase::Write => self.timing.write = Some(elapsed),
        }
        Ok(value)
    }

    /// Stop the clock and stamp the total
    pub fn finish(mut self) -> PhaseTiming {
        self.timing.total = Some(self.started.elapsed());
        self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_records_phases_and_total() {
        let mut clock = PhaseClock::start();
        clock
            .measure(Phase::Open, || -> Result<(), ()> {
                thread::sleep(Duration::from_millis(2));
                Ok(())
            })
            .unwrap();
        let rows = clock
            .measure(Phase::Read, || -> Result<usize, ()> { Ok(42) })
            .unwrap();
        let timing = clock.finish();

        assert_eq!(rows, 42);
        assert!(timing.open.unwrap() >= Duration::from_millis(2));
        assert!(timing.read.is_some());
        assert!(timing.write.is_none());
        assert!(timing.total.unwrap() >= timing.phase_sum());
    }

    #[test]
    fn test_failed_phase_is_not_recorded() {
        let mut clock = PhaseClock::start();
        let result = clock.measure(Phase::Open, || -> Result<(), &str> { Err("missing") });
        assert_eq!(result, Err("missing"));
        assert!(clock.finish().open.is_none());
    }

    #[test]
    fn test_display_skips_absent_phases() {
        let timing = PhaseTiming {
            open: Some(Duration::from_millis(1)),
            read: Some(Duration::from_millis(2)),
            write: None,
            total: Some(Duration::from_millis(4)),
        };
        let text = timing.to_string();
        assert!(text.contains("Time to open file: 0.001000 seconds"));
        assert!(!text.contains("write"));
        assert!(text.ends_with("Total time: 0.004000 seconds"));
        assert_eq!(timing.phase_sum(), Duration::from_millis(3));
    }
}
