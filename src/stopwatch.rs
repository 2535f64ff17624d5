use std::time::{Duration, Instant};
use log::info;

/// Wall-clock timer for the phases of a clustering run.
///
/// The original design hid timing behind a global singleton; here a `Stopwatch`
/// is an explicit value threaded through the entry points, so a supervisor can
/// inspect phase durations and interrupt between phases.
pub struct Stopwatch {
    run_name : String,
    started : Instant,
    phase_name : Option<String>,
    phase_started : Instant,
    phases : Vec<(String, Duration)>
}

impl Stopwatch {
    /// Start timing a run.
    pub fn start<S : Into<String>>(run_name : S) -> Self {
        let now = Instant::now();
        Stopwatch {
            run_name : run_name.into(),
            started : now,
            phase_name : None,
            phase_started : now,
            phases : Vec::new()
        }
    }

    /// Begin a named phase, closing out the previous phase (if any) and logging its duration.
    pub fn phase<S : Into<String>>(&mut self, phase_name : S) {
        self.finish_phase();
        self.phase_name = Some(phase_name.into());
        self.phase_started = Instant::now();
    }

    /// Close out the current phase without starting another.
    pub fn finish_phase(&mut self) {
        if let Some(name) = self.phase_name.take() {
            let elapsed = self.phase_started.elapsed();
            info!("{}: phase '{}' took {:?}", self.run_name, name, elapsed);
            self.phases.push((name, elapsed));
        }
    }

    /// Total time since the run started.
    pub fn elapsed(&self) -> Duration { self.started.elapsed() }

    /// Durations of all completed phases, in the order they ran.
    pub fn completed_phases(&self) -> &[(String, Duration)] { &self.phases }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.finish_phase();
        info!("{}: total {:?}", self.run_name, self.elapsed());
    }
}
