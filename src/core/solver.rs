use serde::Serialize;

use super::config::TaxYearConfig;
use super::engine::{calculate_inside_ir35, calculate_outside_ir35, normalize_inputs};
use super::error::CalcError;
use super::types::{EngagementInputs, Route};

/// Bisection of an f64 bracket cannot narrow further after about 1,100 steps.
pub const MAX_SOLVE_ITERATIONS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveConfig {
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            search_min: 1.0,
            search_max: 10_000.0,
            tolerance: 0.01,
            max_iterations: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_day_rate: f64,
    pub take_home: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRateSolveResult {
    pub route: Route,
    pub target_take_home: f64,
    pub days_per_week: f64,
    pub weeks_per_year: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_day_rate: Option<f64>,
    pub achieved_take_home: Option<f64>,
    pub iterations: Vec<SolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Lowest day rate (within tolerance) on `route` whose annual take-home
/// reaches `target_take_home`, found by bisection.
///
/// Bisection assumes take-home rises with the day rate. That holds for the
/// inside route and for the statutory outside route; the reference outside
/// route has small steps at tier boundaries, so the answer there is a
/// crossing point rather than necessarily the lowest one.
pub fn solve_day_rate(
    route: Route,
    target_take_home: f64,
    days_per_week: f64,
    weeks_per_year: f64,
    config: &TaxYearConfig,
    solve: SolveConfig,
) -> Result<DayRateSolveResult, CalcError> {
    validate_solve_config(target_take_home, solve)?;
    let base = EngagementInputs::new(solve.search_min, days_per_week, weeks_per_year);
    normalize_inputs(&base)?;

    let mut iterations = Vec::new();
    let low_take_home = evaluate_candidate(route, &base, solve.search_min, config)?;
    let high_take_home = evaluate_candidate(route, &base, solve.search_max, config)?;

    let mut solved_day_rate = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_take_home >= target_take_home {
        solved_day_rate = Some(solve.search_min);
        converged = true;
        feasible = true;
        message = "Already meets target at lower day rate bound.".to_string();
    } else if high_take_home < target_take_home {
        feasible = false;
        message = "No day rate within the search bounds reaches the target take-home.".to_string();
    } else {
        let mut lo = solve.search_min;
        let mut hi = solve.search_max;
        let mut it = 0;
        while it < solve.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let take_home = evaluate_candidate(route, &base, mid, config)?;
            iterations.push(SolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_day_rate: mid,
                take_home,
            });

            if take_home >= target_take_home {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= solve.tolerance {
                converged = true;
                break;
            }
        }
        solved_day_rate = Some(hi);
        feasible = true;
        message = if converged {
            "Solved day rate for target take-home.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let achieved_take_home = match solved_day_rate {
        Some(rate) => Some(evaluate_candidate(route, &base, rate, config)?),
        None => None,
    };

    Ok(DayRateSolveResult {
        route,
        target_take_home,
        days_per_week,
        weeks_per_year,
        search_min: solve.search_min,
        search_max: solve.search_max,
        tolerance: solve.tolerance,
        max_iterations: solve.max_iterations,
        solved_day_rate,
        achieved_take_home,
        iterations,
        converged,
        feasible,
        message,
    })
}

/// Inside-IR35 day rate giving the same take-home as `inputs` earns outside IR35.
pub fn equivalent_inside_day_rate(
    inputs: &EngagementInputs,
    config: &TaxYearConfig,
    solve: SolveConfig,
) -> Result<DayRateSolveResult, CalcError> {
    let outside = calculate_outside_ir35(inputs, config)?;
    solve_day_rate(
        Route::Inside,
        outside.take_home,
        inputs.days_per_week,
        inputs.weeks_per_year,
        config,
        solve,
    )
}

fn evaluate_candidate(
    route: Route,
    base: &EngagementInputs,
    day_rate: f64,
    config: &TaxYearConfig,
) -> Result<f64, CalcError> {
    let inputs = base.with_day_rate(day_rate);
    match route {
        Route::Inside => Ok(calculate_inside_ir35(&inputs, config)?.take_home),
        Route::Outside => Ok(calculate_outside_ir35(&inputs, config)?.take_home),
    }
}

fn validate_solve_config(target_take_home: f64, solve: SolveConfig) -> Result<(), CalcError> {
    if !target_take_home.is_finite() {
        return Err(CalcError::invalid("targetTakeHome", "must be finite"));
    }
    if !solve.search_min.is_finite() || !solve.search_max.is_finite() {
        return Err(CalcError::invalid("searchMin", "search bounds must be finite"));
    }
    if solve.search_min <= 0.0 {
        return Err(CalcError::invalid("searchMin", "must be > 0"));
    }
    if solve.search_max <= solve.search_min {
        return Err(CalcError::invalid("searchMax", "must be greater than searchMin"));
    }
    if !solve.tolerance.is_finite() || solve.tolerance <= 0.0 {
        return Err(CalcError::invalid("tolerance", "must be > 0"));
    }
    if solve.max_iterations == 0 || solve.max_iterations > MAX_SOLVE_ITERATIONS {
        return Err(CalcError::invalid(
            "maxIterations",
            format!("must be in 1..={MAX_SOLVE_ITERATIONS}"),
        ));
    }
    Ok(())
}
