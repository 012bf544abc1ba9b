pub mod estimate;
pub mod selection;
