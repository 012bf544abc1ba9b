pub mod config;
pub mod domain;
pub mod errors;
pub mod page;
pub mod pricing;
pub mod session;

pub use config::{AppConfig, ConfigError, LoadOptions, PricingConfig};
pub use domain::estimate::{EstimateDocument, EstimateGroups, LineKind, SummaryGroup, SummaryLineItem};
pub use domain::selection::{PricingMode, RadioGroupRule, SelectionId, SelectionItem};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use page::{InMemoryPage, PageMutation, PageSnapshot};
pub use pricing::accumulator::{DeterministicPriceAccumulator, PriceAccumulator, PricingResult};
pub use pricing::serialization::SerializedEstimate;
pub use pricing::PricingContext;
pub use session::{EstimateSession, GuestInput, PageAdapter, RecomputeReport, RecomputeStatus};
