// Report emission
//   A pure grouping of timing samples: mode -> phase -> durations. The same
//   sample sequence always produces the same report, however many times it
//   is regenerated.

use crate::config::AccessMode;
use crate::sample::{Phase, TimingSample};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeTimings {
    open: Vec<Duration>,
    compute: Vec<Duration>,
}

impl ModeTimings {
    fn record(&mut self, phase: Phase, duration: Duration) {
        match phase {
            Phase::Open => self.open.push(duration),
            Phase::Compute => self.compute.push(duration),
        }
    }

    pub fn durations(&self, phase: Phase) -> &[Duration] {
        match phase {
            Phase::Open => &self.open,
            Phase::Compute => &self.compute,
        }
    }

    pub fn mean(&self, phase: Phase) -> Option<Duration> {
        let durations = self.durations(phase);
        if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<Duration>() / durations.len() as u32)
        }
    }

    pub fn total(&self) -> Duration {
        self.open.iter().sum::<Duration>() + self.compute.iter().sum::<Duration>()
    }
}

/// Timing samples grouped by mode and phase. Derived from a sample log on
/// demand, never stored independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkReport {
    groups: BTreeMap<AccessMode, ModeTimings>,
}

impl BenchmarkReport {
    pub fn from_samples(samples: &[TimingSample]) -> Self {
        let mut groups: BTreeMap<AccessMode, ModeTimings> = BTreeMap::new();
        for sample in samples {
            groups
                .entry(sample.mode)
                .or_default()
                .record(sample.phase, sample.duration);
        }
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn modes(&self) -> impl Iterator<Item = AccessMode> + '_ {
        self.groups.keys().copied()
    }

    pub fn timings(&self, mode: AccessMode) -> Option<&ModeTimings> {
        self.groups.get(&mode)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("mode,phase,seconds\n");
        for (mode, timings) in &self.groups {
            for phase in [Phase::Open, Phase::Compute] {
                for duration in timings.durations(phase) {
                    out.push_str(&format!("{mode},{phase},{:.6}\n", duration.as_secs_f64()));
                }
            }
        }
        out
    }
}

fn fmt_mean(duration: Option<Duration>) -> String {
    match duration {
        Some(duration) => format!("{:.3}s", duration.as_secs_f64()),
        None => "-".to_string(),
    }
}

impl Display for BenchmarkReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<16} {:>12} {:>12} {:>12}",
            "mode", "open", "compute", "total"
        )?;
        for (mode, timings) in &self.groups {
            writeln!(
                f,
                "{:<16} {:>12} {:>12} {:>12}",
                mode.name(),
                fmt_mean(timings.mean(Phase::Open)),
                fmt_mean(timings.mean(Phase::Compute)),
                format!("{:.3}s", timings.total().as_secs_f64()),
            )?;
        }

        let max_total = self
            .groups
            .values()
            .map(|timings| timings.total().as_secs_f64())
            .fold(0.0, f64::max);
        if max_total > 0.0 {
            writeln!(f)?;
            for (mode, timings) in &self.groups {
                let share = timings.total().as_secs_f64() / max_total;
                let width = ((share * BAR_WIDTH as f64).round() as usize).max(1);
                writeln!(f, "{:<16} {}", mode.name(), "#".repeat(width))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mode: AccessMode, phase: Phase, millis: u64) -> TimingSample {
        TimingSample::new(mode, phase, Duration::from_millis(millis))
    }

    fn sample_log() -> Vec<TimingSample> {
        vec![
            sample(AccessMode::RemoteDefault, Phase::Open, 120),
            sample(AccessMode::RemoteDefault, Phase::Compute, 4000),
            sample(AccessMode::RemoteTuned, Phase::Open, 80),
            sample(AccessMode::RemoteTuned, Phase::Compute, 1500),
            sample(AccessMode::RemoteTuned, Phase::Open, 100),
            sample(AccessMode::RemoteTuned, Phase::Compute, 1300),
        ]
    }

    #[test]
    fn grouping_is_a_pure_function() {
        let samples = sample_log();
        let first = BenchmarkReport::from_samples(&samples);
        let second = BenchmarkReport::from_samples(&samples);
        assert_eq!(first, second);
        assert_eq!(first.to_csv(), second.to_csv());
    }

    #[test]
    fn groups_by_mode_and_phase() {
        let report = BenchmarkReport::from_samples(&sample_log());
        assert_eq!(report.modes().count(), 2);
        let tuned = report.timings(AccessMode::RemoteTuned).unwrap();
        assert_eq!(tuned.durations(Phase::Open).len(), 2);
        assert_eq!(tuned.mean(Phase::Open), Some(Duration::from_millis(90)));
        assert_eq!(tuned.mean(Phase::Compute), Some(Duration::from_millis(1400)));
        assert_eq!(tuned.total(), Duration::from_millis(2980));
    }

    #[test]
    fn empty_log_renders_empty_report() {
        let report = BenchmarkReport::from_samples(&[]);
        assert!(report.is_empty());
        assert!(report.timings(AccessMode::RemoteTuned).is_none());
        assert_eq!(report.to_csv(), "mode,phase,seconds\n");
    }

    #[test]
    fn csv_lists_every_sample() {
        let report = BenchmarkReport::from_samples(&sample_log());
        let csv = report.to_csv();
        assert_eq!(csv.lines().count(), 7);
        assert!(csv.contains("remote-default,compute,4.000000"));
        assert!(csv.contains("remote-tuned,open,0.080000"));
    }

    #[test]
    fn display_includes_every_mode() {
        let report = BenchmarkReport::from_samples(&sample_log());
        let rendered = report.to_string();
        assert!(rendered.contains("remote-default"));
        assert!(rendered.contains("remote-tuned"));
        assert!(rendered.contains('#'));
    }
}
