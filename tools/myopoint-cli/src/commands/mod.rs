pub mod check;
pub mod replay;
pub mod simulate;
pub mod thresholds;
