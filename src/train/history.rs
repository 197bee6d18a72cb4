use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::train::epoch_stats::EpochStats;

/// Which sequence of a `RunningHistory` an epoch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Eval,
}

/// Per-epoch statistics accumulated across calls to `run_epoch`.
///
/// The loop only ever appends; resetting or sharing a history between runs is
/// up to whoever owns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningHistory {
    pub train: Vec<EpochStats>,
    pub eval: Vec<EpochStats>,
}

impl RunningHistory {
    pub fn new() -> RunningHistory {
        RunningHistory::default()
    }

    pub fn record(&mut self, phase: Phase, stats: EpochStats) {
        match phase {
            Phase::Train => self.train.push(stats),
            Phase::Eval => self.eval.push(stats),
        }
    }

    pub fn phase(&self, phase: Phase) -> &[EpochStats] {
        match phase {
            Phase::Train => &self.train,
            Phase::Eval => &self.eval,
        }
    }

    pub fn losses(&self, phase: Phase) -> Vec<f64> {
        self.phase(phase).iter().map(|s| s.loss).collect()
    }

    pub fn accuracies(&self, phase: Phase) -> Vec<f64> {
        self.phase(phase).iter().map(|s| s.accuracy).collect()
    }

    pub fn clear(&mut self) {
        self.train.clear();
        self.eval.clear();
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<RunningHistory> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(loss: f64) -> EpochStats {
        EpochStats { loss, accuracy: 0.5, batches: 1, examples: 4, elapsed_ms: 0 }
    }

    #[test]
    fn records_into_the_right_sequence() {
        let mut h = RunningHistory::new();
        h.record(Phase::Train, stats(1.0));
        h.record(Phase::Train, stats(0.5));
        h.record(Phase::Eval, stats(0.7));
        assert_eq!(h.losses(Phase::Train), vec![1.0, 0.5]);
        assert_eq!(h.accuracies(Phase::Eval), vec![0.5]);
        h.clear();
        assert!(h.train.is_empty() && h.eval.is_empty());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut h = RunningHistory::new();
        h.record(Phase::Eval, stats(0.25));
        h.save_json(&path).unwrap();
        assert_eq!(RunningHistory::load_json(&path).unwrap(), h);
    }
}
