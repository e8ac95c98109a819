mod config;
mod engine;
mod error;
mod memo;
mod solver;
mod types;

pub use config::{CalculationMethod, TaxConfigRegistry, TaxYear, TaxYearConfig};
pub use engine::{
    calculate_inside_ir35, calculate_outside_ir35, compare, compute_tax_comparison,
    normalize_inputs,
};
pub use error::CalcError;
pub use memo::{ComparisonCache, DEFAULT_CACHE_CAPACITY};
pub use solver::{
    DayRateSolveResult, MAX_SOLVE_ITERATIONS, SolveConfig, SolveIteration,
    equivalent_inside_day_rate, solve_day_rate,
};
pub use types::{Comparison, EngagementInputs, InsideIr35Result, OutsideIr35Result, Route};
