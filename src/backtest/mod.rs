pub mod classifier;
pub mod matrix;
pub mod simulator;
pub mod staking;
pub mod strategy;
pub mod sweep;

pub use classifier::{classify_all, ClassifierSettings};
pub use matrix::MissingCellPolicy;
pub use simulator::{SimulationResult, SimulatorSettings};
pub use strategy::{policies_for, strategy_grid, StakeParams};
pub use sweep::{run_sweep, top_results, RankBy};
