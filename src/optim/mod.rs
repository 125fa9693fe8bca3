pub mod optimizer;
pub mod sgd;

pub use optimizer::Optimizer;
pub use sgd::{Sgd, SgdConfig};
