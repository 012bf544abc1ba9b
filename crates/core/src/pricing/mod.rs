pub mod accumulator;
pub mod gating;
pub mod numeric;
pub mod registry;
pub mod serialization;
pub mod summary;

use crate::config::PricingConfig;

/// Everything the pure pricing stages need for one recompute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingContext {
    pub guest_count: u32,
    pub settings: PricingConfig,
}

impl PricingContext {
    /// Resolves a raw guest input, falling back to the configured default.
    pub fn from_guest_input(raw: Option<&str>, settings: PricingConfig) -> Self {
        let guest_count = numeric::positive_or(raw, settings.default_guest_count);
        Self { guest_count, settings }
    }
}
