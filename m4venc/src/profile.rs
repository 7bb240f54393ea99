use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Interpolate,
    Motion,
    Coding,
    Frame,
}

const STAGES: [Stage; 4] = [Stage::Interpolate, Stage::Motion, Stage::Coding, Stage::Frame];

/// Accumulated wall time per encoder stage. A disabled profiler never reads
/// the clock.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    enabled: bool,
    totals: [Duration; 4],
    calls: [u64; 4],
}

impl Profiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts timing a stage; pass the token to [`Profiler::record`].
    pub fn start(&self) -> Option<Instant> {
        self.enabled.then(Instant::now)
    }

    pub fn record(&mut self, stage: Stage, started: Option<Instant>) {
        if let Some(started) = started {
            self.totals[stage as usize] += started.elapsed();
            self.calls[stage as usize] += 1;
        }
    }

    pub fn total(&self, stage: Stage) -> Duration {
        self.totals[stage as usize]
    }

    pub fn calls(&self, stage: Stage) -> u64 {
        self.calls[stage as usize]
    }

    /// One line per stage with total and per-call time.
    pub fn summary(&self) -> String {
        STAGES
            .iter()
            .map(|&stage| {
                let calls = self.calls(stage);
                let total = self.total(stage);
                let per_call = total.checked_div(calls.max(1) as u32).unwrap_or_default();
                format!("{stage:?}: {total:?} over {calls} calls ({per_call:?} each)")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_profiler_records_nothing() {
        let mut profiler = Profiler::new(false);
        let started = profiler.start();
        assert!(started.is_none());
        profiler.record(Stage::Motion, started);
        assert_eq!(profiler.calls(Stage::Motion), 0);
        assert_eq!(profiler.total(Stage::Motion), Duration::ZERO);
    }

    #[test]
    fn enabled_profiler_counts_calls_per_stage() {
        let mut profiler = Profiler::new(true);
        for _ in 0..2 {
            let started = profiler.start();
            profiler.record(Stage::Coding, started);
        }
        let started = profiler.start();
        std::thread::sleep(Duration::from_millis(2));
        profiler.record(Stage::Frame, started);

        assert_eq!(profiler.calls(Stage::Coding), 2);
        assert_eq!(profiler.calls(Stage::Interpolate), 0);
        assert!(profiler.total(Stage::Frame) >= Duration::from_millis(2));
        assert_eq!(profiler.summary().lines().count(), 4);
    }
}
