use std::collections::HashMap;

use tracing::debug;

use super::config::{CalculationMethod, TaxYear, TaxYearConfig};
use super::engine::compute_tax_comparison;
use super::error::CalcError;
use super::types::{Comparison, EngagementInputs};

pub const DEFAULT_CACHE_CAPACITY: usize = 4_096;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct CacheKey {
    day_rate: u64,
    days_per_week: u64,
    weeks_per_year: u64,
    tax_year: TaxYear,
    method: CalculationMethod,
    config: [u64; 25],
}

impl CacheKey {
    fn new(inputs: &EngagementInputs, config: &TaxYearConfig) -> Self {
        Self {
            day_rate: inputs.day_rate.to_bits(),
            days_per_week: inputs.days_per_week.to_bits(),
            weeks_per_year: inputs.weeks_per_year.to_bits(),
            tax_year: config.tax_year,
            method: config.calculation_method,
            config: config_bits(config),
        }
    }
}

fn config_bits(config: &TaxYearConfig) -> [u64; 25] {
    [
        config.personal_allowance,
        config.basic_rate,
        config.basic_rate_limit,
        config.higher_rate,
        config.higher_rate_limit,
        config.additional_rate,
        config.ni_primary_threshold,
        config.ni_upper_earnings_limit,
        config.ni_employee_rate,
        config.ni_employee_upper_rate,
        config.ni_secondary_threshold,
        config.ni_employer_rate,
        config.dividend_allowance,
        config.dividend_basic_rate,
        config.dividend_higher_rate,
        config.dividend_additional_rate,
        config.corp_tax_small_rate,
        config.corp_tax_main_rate,
        config.corp_tax_marginal_rate,
        config.small_profits_limit,
        config.main_rate_limit,
        config.umbrella_weekly_fee,
        config.expenses_allowance_rate,
        config.company_expenses,
        config.working_weeks,
    ]
    .map(f64::to_bits)
}

/// Bounded memo of comparisons keyed on the exact inputs and every value of
/// the config.
#[derive(Debug)]
pub struct ComparisonCache {
    entries: HashMap<CacheKey, Comparison>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl ComparisonCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_compute(
        &mut self,
        inputs: &EngagementInputs,
        config: &TaxYearConfig,
    ) -> Result<Comparison, CalcError> {
        let key = CacheKey::new(inputs, config);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(hit.clone());
        }

        self.misses += 1;
        let comparison = compute_tax_comparison(inputs, config)?;
        if self.entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "comparison cache full, clearing");
            self.entries.clear();
        }
        self.entries.insert(key, comparison.clone());
        Ok(comparison)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for ComparisonCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_inputs_are_served_from_cache() {
        let mut cache = ComparisonCache::default();
        let config = TaxYearConfig::uk_2024_25();
        let inputs = EngagementInputs::new(800.0, 4.0, 48.0);

        let first = cache.get_or_compute(&inputs, &config).expect("valid");
        let second = cache.get_or_compute(&inputs, &config).expect("valid");

        assert_eq!(first, second);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn tax_year_and_method_are_part_of_the_key() {
        let mut cache = ComparisonCache::default();
        let inputs = EngagementInputs::new(800.0, 4.0, 48.0);
        let reference = TaxYearConfig::uk_2024_25();
        let statutory = reference
            .clone()
            .with_calculation_method(CalculationMethod::Statutory);
        let later = TaxYearConfig::uk_2025_26();

        let a = cache.get_or_compute(&inputs, &reference).expect("valid");
        let b = cache.get_or_compute(&inputs, &statutory).expect("valid");
        let c = cache.get_or_compute(&inputs, &later).expect("valid");

        assert_eq!(cache.misses(), 3);
        assert_ne!(a.outside.corporation_tax, b.outside.corporation_tax);
        assert_eq!(c.tax_year, TaxYear(2026));
    }

    #[test]
    fn same_year_with_different_values_is_a_separate_entry() {
        let mut cache = ComparisonCache::default();
        let inputs = EngagementInputs::new(800.0, 4.0, 48.0);
        let builtin = TaxYearConfig::uk_2024_25();
        let mut custom = builtin.clone();
        custom.umbrella_weekly_fee = 40.0;
        custom.company_expenses = 5_000.0;

        let a = cache.get_or_compute(&inputs, &builtin).expect("valid");
        let b = cache.get_or_compute(&inputs, &custom).expect("valid");

        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 0);
        assert!(b.inside.umbrella_margin > a.inside.umbrella_margin);
        assert!(b.outside.company_expenses > a.outside.company_expenses);
    }

    #[test]
    fn invalid_inputs_are_not_cached() {
        let mut cache = ComparisonCache::default();
        let config = TaxYearConfig::uk_2024_25();
        let inputs = EngagementInputs::new(0.0, 4.0, 48.0);

        assert!(cache.get_or_compute(&inputs, &config).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_is_cleared_before_insert() {
        let mut cache = ComparisonCache::new(2);
        let config = TaxYearConfig::uk_2024_25();
        for rate in [500.0, 600.0, 700.0] {
            cache
                .get_or_compute(&EngagementInputs::new(rate, 4.0, 48.0), &config)
                .expect("valid");
        }
        assert_eq!(cache.len(), 1);
    }
}
