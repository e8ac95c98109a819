use tracing::debug;

use super::config::{CalculationMethod, TaxYearConfig};
use super::error::CalcError;
use super::types::{Comparison, EngagementInputs, InsideIr35Result, OutsideIr35Result};

const MAX_DAYS_PER_WEEK: f64 = 7.0;
const MAX_WEEKS_PER_YEAR: f64 = 52.0;

/// Validates the engagement and returns its gross annual income.
pub fn normalize_inputs(inputs: &EngagementInputs) -> Result<f64, CalcError> {
    if !inputs.day_rate.is_finite() || inputs.day_rate <= 0.0 {
        return Err(CalcError::invalid("dayRate", "must be > 0"));
    }

    if !inputs.days_per_week.is_finite()
        || inputs.days_per_week <= 0.0
        || inputs.days_per_week > MAX_DAYS_PER_WEEK
    {
        return Err(CalcError::invalid("daysPerWeek", "must be in (0, 7]"));
    }

    if !inputs.weeks_per_year.is_finite()
        || inputs.weeks_per_year <= 0.0
        || inputs.weeks_per_year > MAX_WEEKS_PER_YEAR
    {
        return Err(CalcError::invalid("weeksPerYear", "must be in (0, 52]"));
    }

    Ok(inputs.day_rate * inputs.days_per_week * inputs.weeks_per_year)
}

pub fn calculate_inside_ir35(
    inputs: &EngagementInputs,
    config: &TaxYearConfig,
) -> Result<InsideIr35Result, CalcError> {
    let gross_annual = normalize_inputs(inputs)?;

    let umbrella_margin = config.umbrella_weekly_fee * inputs.weeks_per_year;
    // Annualised secondary threshold, matching the published calculator figures.
    let employer_ni = ((gross_annual - umbrella_margin - config.ni_secondary_threshold * 12.0)
        * config.ni_employer_rate)
        .max(0.0);
    let expenses_allowance = gross_annual * config.expenses_allowance_rate;
    let taxable_gross =
        (gross_annual - umbrella_margin - employer_ni - expenses_allowance).max(0.0);

    let income_tax = uk_income_tax(taxable_gross, config);
    let employee_ni = employee_ni(taxable_gross, config);

    let total_tax = income_tax + employee_ni + employer_ni;
    let take_home = gross_annual - income_tax - employee_ni - umbrella_margin - employer_ni;
    let effective_rate = (total_tax + umbrella_margin) / gross_annual * 100.0;

    Ok(InsideIr35Result {
        gross_annual,
        umbrella_margin,
        employer_ni,
        expenses_allowance,
        taxable_gross,
        income_tax,
        employee_ni,
        total_tax,
        take_home,
        effective_rate,
    })
}

pub fn calculate_outside_ir35(
    inputs: &EngagementInputs,
    config: &TaxYearConfig,
) -> Result<OutsideIr35Result, CalcError> {
    let revenue = normalize_inputs(inputs)?;

    let salary = config.personal_allowance;
    let company_expenses = config.company_expenses;
    let company_profit = revenue - salary - company_expenses;

    let corporation_tax = corporation_tax(company_profit, config);
    let available_for_dividends = (company_profit - corporation_tax).max(0.0);
    let dividend_tax = match config.calculation_method {
        CalculationMethod::Reference => {
            reference_dividend_tax(salary, available_for_dividends, config)
        }
        CalculationMethod::Statutory => {
            stacked_dividend_tax(salary, available_for_dividends, config)
        }
    };

    let total_tax = corporation_tax + dividend_tax;
    let take_home = revenue - total_tax - company_expenses;
    let effective_rate = (total_tax + company_expenses) / revenue * 100.0;

    Ok(OutsideIr35Result {
        gross_annual: revenue,
        salary,
        company_expenses,
        company_profit,
        corporation_tax,
        available_for_dividends,
        dividend_tax,
        total_tax,
        take_home,
        effective_rate,
    })
}

/// Returns `(difference, percentage_saved)`; the percentage is `None` when the
/// inside take-home is not positive.
pub fn compare(inside: &InsideIr35Result, outside: &OutsideIr35Result) -> (f64, Option<f64>) {
    let difference = outside.take_home - inside.take_home;
    if inside.take_home <= 0.0 {
        debug!(
            inside_take_home = inside.take_home,
            "inside take-home is not positive; percentage saved is undefined"
        );
        return (difference, None);
    }
    (difference, Some(difference / inside.take_home * 100.0))
}

pub fn compute_tax_comparison(
    inputs: &EngagementInputs,
    config: &TaxYearConfig,
) -> Result<Comparison, CalcError> {
    let gross_annual = normalize_inputs(inputs)?;
    let inside = calculate_inside_ir35(inputs, config)?;
    let outside = calculate_outside_ir35(inputs, config)?;
    let (difference, percentage_saved) = compare(&inside, &outside);

    Ok(Comparison {
        tax_year: config.tax_year,
        gross_annual,
        inside,
        outside,
        difference,
        percentage_saved,
    })
}

fn uk_income_tax(taxable_gross: f64, config: &TaxYearConfig) -> f64 {
    let taxable_income = (taxable_gross - config.personal_allowance).max(0.0);

    let basic_band_width = (config.basic_rate_limit - config.personal_allowance).max(0.0);
    let higher_band_width = (config.higher_rate_limit - config.basic_rate_limit).max(0.0);

    let basic_taxable = taxable_income.min(basic_band_width);
    let higher_taxable = (taxable_income - basic_taxable)
        .min(higher_band_width)
        .max(0.0);
    let additional_taxable = (taxable_income - basic_taxable - higher_taxable).max(0.0);

    basic_taxable * config.basic_rate
        + higher_taxable * config.higher_rate
        + additional_taxable * config.additional_rate
}

fn employee_ni(taxable_gross: f64, config: &TaxYearConfig) -> f64 {
    let above_threshold = (taxable_gross - config.ni_primary_threshold).max(0.0);
    let main_band_width =
        (config.ni_upper_earnings_limit - config.ni_primary_threshold).max(0.0);

    let main_taxable = above_threshold.min(main_band_width);
    let upper_taxable = (above_threshold - main_taxable).max(0.0);

    main_taxable * config.ni_employee_rate + upper_taxable * config.ni_employee_upper_rate
}

fn corporation_tax(company_profit: f64, config: &TaxYearConfig) -> f64 {
    let profit = company_profit.max(0.0);
    if profit <= config.small_profits_limit {
        return profit * config.corp_tax_small_rate;
    }

    match config.calculation_method {
        CalculationMethod::Reference => {
            if profit <= config.main_rate_limit {
                profit * config.corp_tax_marginal_rate
            } else {
                profit * config.corp_tax_main_rate
            }
        }
        CalculationMethod::Statutory => {
            let relief = if profit < config.main_rate_limit {
                config.marginal_relief_fraction() * (config.main_rate_limit - profit)
            } else {
                0.0
            };
            (profit * config.corp_tax_main_rate - relief).max(0.0)
        }
    }
}

fn reference_dividend_tax(salary: f64, dividends: f64, config: &TaxYearConfig) -> f64 {
    let taxable_dividends = (dividends - config.dividend_allowance).max(0.0);
    if taxable_dividends <= 0.0 {
        return 0.0;
    }

    let income_after_allowance = salary + dividends - config.personal_allowance;
    let basic_band_remaining =
        (config.basic_rate_limit - config.personal_allowance - salary).max(0.0);

    if taxable_dividends <= basic_band_remaining {
        return taxable_dividends * config.dividend_basic_rate;
    }

    let basic_tax = basic_band_remaining * config.dividend_basic_rate;
    if income_after_allowance <= config.higher_rate_limit - config.personal_allowance {
        let higher_taxable = taxable_dividends - basic_band_remaining;
        return basic_tax + higher_taxable * config.dividend_higher_rate;
    }

    let higher_taxable = (config.higher_rate_limit - config.basic_rate_limit).max(0.0);
    let additional_taxable = (taxable_dividends - basic_band_remaining - higher_taxable).max(0.0);
    basic_tax
        + higher_taxable * config.dividend_higher_rate
        + additional_taxable * config.dividend_additional_rate
}

/// Dividends sit on top of the salary. Unused personal allowance covers them
/// first, then the dividend allowance, and the remainder is taxed at the
/// dividend rate of whichever income tax band it lands in.
fn stacked_dividend_tax(salary: f64, dividends: f64, config: &TaxYearConfig) -> f64 {
    let dividends = dividends.max(0.0);
    let covered_by_allowance = (config.personal_allowance - salary).clamp(0.0, dividends);
    let covered_by_dividend_allowance =
        (dividends - covered_by_allowance).min(config.dividend_allowance);

    let start = salary.max(0.0) + covered_by_allowance + covered_by_dividend_allowance;
    let end = salary.max(0.0) + dividends;

    let slice = |lower: f64, upper: f64| (end.min(upper) - start.max(lower)).max(0.0);

    slice(0.0, config.basic_rate_limit) * config.dividend_basic_rate
        + slice(config.basic_rate_limit, config.higher_rate_limit) * config.dividend_higher_rate
        + slice(config.higher_rate_limit, f64::INFINITY) * config.dividend_additional_rate
}
