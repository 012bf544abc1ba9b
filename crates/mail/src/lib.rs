//! Backend estimate formatter: turns a submitted calculator form into the
//! rendered estimate emails.

pub mod render;
pub mod submission;

pub use render::{EmailEnvelope, EstimateFormatter, Recipient, RenderError, TableGroup, TableRow};
pub use submission::{parse_submission, CustomerInfo, Submission};
