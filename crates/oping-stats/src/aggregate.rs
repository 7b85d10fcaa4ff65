use oping_model::{ProbeId, ProbeResult, SeriesStats, SeriesSummary};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct TargetSeries {
    target: String,
    series: Vec<(ProbeId, SeriesStats)>,
}

/// Statistics for every target and probe id seen so far, in first-seen
/// order. Series are created on first use and never removed.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    index: HashMap<String, usize>,
    targets: Vec<TargetSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub target: String,
    pub probe: ProbeId,
    #[serde(flatten)]
    pub summary: SeriesSummary,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &ProbeResult) {
        let slot = match self.index.get(&result.target) {
            Some(&slot) => slot,
            None => {
                self.targets.push(TargetSeries {
                    target: result.target.clone(),
                    series: Vec::new(),
                });
                let slot = self.targets.len() - 1;
                self.index.insert(result.target.clone(), slot);
                slot
            }
        };

        let id = result.probe_id();
        let series = &mut self.targets[slot].series;
        let pos = match series.iter().position(|(existing, _)| *existing == id) {
            Some(pos) => pos,
            None => {
                series.push((id, SeriesStats::default()));
                series.len() - 1
            }
        };
        series[pos].1.push(result.rtt_ms);
    }

    pub fn series(&self, target: &str, id: ProbeId) -> Option<&SeriesStats> {
        let slot = *self.index.get(target)?;
        self.targets[slot]
            .series
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, stats)| stats)
    }

    /// Summary of one series; a series never recorded summarizes as zeros.
    pub fn summarize(&self, target: &str, id: ProbeId) -> SeriesSummary {
        self.series(target, id)
            .map(SeriesStats::summary)
            .unwrap_or_default()
    }

    pub fn report(&self) -> Vec<ReportRow> {
        self.targets
            .iter()
            .flat_map(|entry| {
                entry.series.iter().map(|(id, stats)| ReportRow {
                    target: entry.target.clone(),
                    probe: *id,
                    summary: stats.summary(),
                })
            })
            .collect()
    }

    pub fn total_attempts(&self) -> u64 {
        self.targets
            .iter()
            .flat_map(|entry| entry.series.iter())
            .map(|(_, stats)| stats.attempts())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
