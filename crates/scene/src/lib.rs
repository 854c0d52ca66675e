pub mod autofit;
pub mod camera;

pub use autofit::{AutoFit, FitPhase};
pub use camera::*;
