//! Recompute pipeline over a page adapter.
//!
//! Every recompute re-reads the page, gates, prices, reconciles the summary and
//! writes the results back. The session owns no widget state of its own.

use tracing::{debug, info, warn};

use crate::config::PricingConfig;
use crate::domain::selection::SelectionId;
use crate::pricing::accumulator::{DeterministicPriceAccumulator, PriceAccumulator, PricingResult};
use crate::pricing::gating::{apply_gating, excluded_targets, GatingAction};
use crate::pricing::registry::{list_selections, RawWidget};
use crate::pricing::serialization::{serialize, SerializedEstimate};
use crate::pricing::summary::SummaryModel;
use crate::pricing::PricingContext;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuestInput {
    Mounted(String),
    /// The guest widget has not been attached to the page yet.
    NotMounted,
}

/// Everything the pipeline reads from or writes to the page.
pub trait PageAdapter {
    fn read_selections(&self) -> Vec<RawWidget>;
    fn read_guest_count(&self) -> GuestInput;
    fn set_eligible(&mut self, id: &SelectionId, eligible: bool);
    /// Checks the reset control of `group_key`, unchecking its siblings.
    fn apply_reset(&mut self, group_key: &str, control: &SelectionId);
    fn uncheck(&mut self, id: &SelectionId);
    fn render_total(&mut self, total_display: &str);
    fn write_hidden_fields(&mut self, text: &str, json: &str);
    fn summary_container_present(&self) -> bool;
    fn render_summary(&mut self, estimate: &SerializedEstimate);
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecomputeReport {
    pub guest_count: u32,
    pub pricing: PricingResult,
    pub actions: Vec<GatingAction>,
    pub estimate: SerializedEstimate,
    /// False when the output matched the previous run and no writes were issued.
    pub rendered: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecomputeStatus {
    Completed(Box<RecomputeReport>),
    /// Call `recompute` once more; the next run proceeds with the default guest count.
    RetryScheduled,
}

impl RecomputeStatus {
    pub fn report(&self) -> Option<&RecomputeReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::RetryScheduled => None,
        }
    }
}

pub struct EstimateSession<A, P = DeterministicPriceAccumulator> {
    adapter: A,
    accumulator: P,
    settings: PricingConfig,
    summary: SummaryModel,
    retry_pending: bool,
    last_output: Option<SerializedEstimate>,
}

impl<A: PageAdapter> EstimateSession<A> {
    pub fn new(adapter: A, settings: PricingConfig) -> Self {
        Self::with_accumulator(adapter, DeterministicPriceAccumulator, settings)
    }
}

impl<A: PageAdapter, P: PriceAccumulator> EstimateSession<A, P> {
    pub fn with_accumulator(adapter: A, accumulator: P, settings: PricingConfig) -> Self {
        Self {
            adapter,
            accumulator,
            settings,
            summary: SummaryModel::new(),
            retry_pending: false,
            last_output: None,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    pub fn summary(&self) -> &SummaryModel {
        &self.summary
    }

    pub fn recompute(&mut self) -> RecomputeStatus {
        let raw_guests = match self.adapter.read_guest_count() {
            GuestInput::Mounted(raw) => {
                self.retry_pending = false;
                Some(raw)
            }
            GuestInput::NotMounted if !self.retry_pending => {
                self.retry_pending = true;
                info!(
                    event_name = "pricing.recompute.retry_scheduled",
                    "guest input not mounted; recompute rescheduled once"
                );
                return RecomputeStatus::RetryScheduled;
            }
            GuestInput::NotMounted => {
                self.retry_pending = false;
                warn!(
                    event_name = "pricing.recompute.guest_input_missing",
                    default_guest_count = self.settings.default_guest_count,
                    "guest input still not mounted; using default guest count"
                );
                None
            }
        };

        let context = PricingContext::from_guest_input(raw_guests.as_deref(), self.settings.clone());
        let guest_count = context.guest_count;

        let registry = list_selections(&self.adapter.read_selections(), &context.settings);
        let gating = apply_gating(&registry.items, guest_count, &registry.reset_controls);
        self.dispatch(&gating.actions);

        let pricing = self.accumulator.price(&gating.items, guest_count, &registry.rules);
        let excluded = excluded_targets(&gating.items, &registry.rules);
        self.summary.reconcile(&gating.items, &excluded, &pricing, &context.settings);

        let estimate = serialize(&self.summary, guest_count, pricing.total, &context.settings);
        let rendered = self.write_output(&estimate);

        info!(
            event_name = "pricing.recompute.completed",
            guest_count,
            total = %estimate.total_display,
            priced_lines = pricing.steps.len(),
            gating_actions = gating.actions.len(),
            rendered,
            "estimate recomputed"
        );

        RecomputeStatus::Completed(Box::new(RecomputeReport {
            guest_count,
            pricing,
            actions: gating.actions,
            estimate,
            rendered,
        }))
    }

    fn dispatch(&mut self, actions: &[GatingAction]) {
        for action in actions {
            match action {
                GatingAction::SetEligible { id, eligible } => {
                    self.adapter.set_eligible(id, *eligible);
                }
                GatingAction::InvokeReset { group_key, control } => {
                    self.adapter.apply_reset(group_key, control);
                }
                GatingAction::Uncheck { id } => self.adapter.uncheck(id),
            }
        }
    }

    fn write_output(&mut self, estimate: &SerializedEstimate) -> bool {
        if self.last_output.as_ref() == Some(estimate) {
            return false;
        }

        self.adapter.render_total(&estimate.total_display);
        self.adapter.write_hidden_fields(&estimate.text, &estimate.json);
        if self.adapter.summary_container_present() {
            self.adapter.render_summary(estimate);
        } else {
            debug!(
                event_name = "pricing.summary.container_missing",
                "summary container absent; skipping summary render"
            );
        }

        self.last_output = Some(estimate.clone());
        true
    }
}
