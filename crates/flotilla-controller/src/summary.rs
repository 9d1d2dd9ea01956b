//! Ready condition and display state derived from a bundle summary.

use flotilla_core::{BundleSummary, Condition};

pub const READY_CONDITION: &str = "Ready";

pub trait Summarizer {
    /// Upsert the `Ready` condition. `scope` names what was counted,
    /// e.g. `"Cluster"`.
    fn set_ready_conditions(&self, conditions: &mut Vec<Condition>, scope: &str, summary: &BundleSummary);

    /// Single word describing the worst state in the summary.
    fn summary_state(&self, summary: &BundleSummary) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSummarizer;

impl DefaultSummarizer {
    /// Non-ready states in decreasing severity.
    fn states(summary: &BundleSummary) -> [(&'static str, u32); 6] {
        [
            ("ErrApplied", summary.err_applied),
            ("OutOfSync", summary.out_of_sync),
            ("Modified", summary.modified),
            ("WaitApplied", summary.wait_applied),
            ("NotReady", summary.not_ready),
            ("Pending", summary.pending),
        ]
    }
}

impl Summarizer for DefaultSummarizer {
    fn set_ready_conditions(&self, conditions: &mut Vec<Condition>, scope: &str, summary: &BundleSummary) {
        let condition = if summary.ready >= summary.desired_ready {
            Condition {
                kind: READY_CONDITION.to_string(),
                status: "True".to_string(),
                ..Default::default()
            }
        } else {
            let counts: Vec<String> = Self::states(summary)
                .iter()
                .filter(|(_, n)| *n > 0)
                .map(|(state, n)| format!("{state}({n})"))
                .collect();
            let detail = if counts.is_empty() {
                String::new()
            } else {
                format!(": {}", counts.join(", "))
            };
            Condition {
                kind: READY_CONDITION.to_string(),
                status: "False".to_string(),
                reason: "NotReady".to_string(),
                message: format!(
                    "{scope} ready {}/{}{detail}",
                    summary.ready, summary.desired_ready
                ),
            }
        };

        match conditions.iter_mut().find(|c| c.kind == READY_CONDITION) {
            Some(existing) => *existing = condition,
            None => conditions.push(condition),
        }
    }

    fn summary_state(&self, summary: &BundleSummary) -> String {
        Self::states(summary)
            .iter()
            .find(|(_, n)| *n > 0)
            .map_or("Ready", |(state, _)| *state)
            .to_string()
    }
}
