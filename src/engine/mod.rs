pub mod estimate;
pub mod finalize;
pub mod history;
pub mod pricing;
pub mod search;
