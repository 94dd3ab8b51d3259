//! Cross-validation aggregation of prediction quality.
//!
//! Three complementary views:
//!
//! - `cv`: per-fold errors binned by true-RUL magnitude (where in the
//!   degradation does the model go wrong?)
//! - `maintenance`: fault-horizon sweeps of unexploited lifetime, unexpected
//!   breaks, and the combined cost metric (what would the model cost in a
//!   maintenance policy?)
//! - `regression`: plain and relative-weighted MAE/MSE summaries per fold
//!   (how accurate is the model overall?)

pub mod cv;
pub mod maintenance;
pub mod regression;

pub use cv::*;
pub use maintenance::*;
pub use regression::*;

/// The three maintenance sweeps of one model, computed over one shared set
/// of horizon points so they are directly comparable.
#[derive(Debug, Clone)]
pub struct ModelSweeps {
    pub unexploited: HorizonSweep,
    pub breaks: HorizonSweep,
    pub cost: HorizonSweep,
}
