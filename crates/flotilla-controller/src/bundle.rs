//! One reconciliation pass over a bundle.

use std::time::Instant;

use tracing::debug;

use flotilla_core::config::RolloutConfig;
use flotilla_core::{Bundle, BundleDeployment, BundleStatus};
use flotilla_inventory::InventoryExtractor;
use flotilla_rollout::{RolloutEngine, TargetResolver, project_all};

use crate::error::{ControllerError, ControllerResult};
use crate::summary::Summarizer;

/// Condition scope used for bundle summaries.
const SUMMARY_SCOPE: &str = "Cluster";

pub struct BundleHandler<'a> {
    targets: &'a dyn TargetResolver,
    inventory: InventoryExtractor<'a>,
    summarizer: &'a dyn Summarizer,
    max_new: u32,
}

impl<'a> BundleHandler<'a> {
    pub fn new(
        targets: &'a dyn TargetResolver,
        inventory: InventoryExtractor<'a>,
        summarizer: &'a dyn Summarizer,
        config: &RolloutConfig,
    ) -> Self {
        Self {
            targets,
            inventory,
            summarizer,
            max_new: config.max_new,
        }
    }

    /// Run one pass and return the deployment records to write back with
    /// the new bundle status.
    ///
    /// Works on a copy of `status`; on error nothing is returned and the
    /// caller's status is unchanged.
    pub fn on_bundle_change(
        &self,
        bundle: &Bundle,
        status: &BundleStatus,
    ) -> ControllerResult<(Vec<BundleDeployment>, BundleStatus)> {
        let key = bundle.meta.key();
        debug!(bundle = %key, "bundle changed, calculating rollout");
        let start = Instant::now();

        let targets = self
            .targets
            .targets(bundle)
            .map_err(ControllerError::Targets)?;

        let mut status = status.clone();
        let changed = RolloutEngine::new(self.targets, self.max_new)
            .calculate_changes(&mut status, targets)?;

        self.inventory.refresh(bundle, &mut status)?;

        self.summarizer
            .set_ready_conditions(&mut status.conditions, SUMMARY_SCOPE, &status.summary);
        status.observed_generation = bundle.meta.generation;

        let objects = project_all(&changed, bundle);

        status.display.ready_clusters = format!(
            "{}/{}",
            status.summary.ready, status.summary.desired_ready
        );
        status.display.state = self.summarizer.summary_state(&status.summary);

        debug!(
            bundle = %key,
            changed = objects.len(),
            elapsed = ?start.elapsed(),
            "bundle pass complete"
        );
        Ok((objects, status))
    }
}
