use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::CalcError;

/// UK tax year, identified by the calendar year it ends in (2025 = 2024/25).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxYear(pub i32);

impl TaxYear {
    pub fn start_year(self) -> i32 {
        self.0 - 1
    }
}

impl fmt::Display for TaxYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.0 - 1, self.0.rem_euclid(100))
    }
}

impl FromStr for TaxYear {
    type Err = CalcError;

    /// Accepts `2024/25`, `2024-25` or the end year on its own (`2025`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unknown = || CalcError::UnknownTaxYear(trimmed.to_string());

        if let Some((start, end)) = trimmed.split_once(['/', '-']) {
            let start: i32 = start.parse().map_err(|_| unknown())?;
            let end: i32 = end.parse().map_err(|_| unknown())?;
            if end.rem_euclid(100) != (start + 1).rem_euclid(100) {
                return Err(unknown());
            }
            return Ok(TaxYear(start + 1));
        }

        trimmed.parse().map(TaxYear).map_err(|_| unknown())
    }
}

impl TryFrom<String> for TaxYear {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaxYear> for String {
    fn from(value: TaxYear) -> Self {
        value.to_string()
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculationMethod {
    /// Figures as shown by the calculator widget: corporation tax is a flat
    /// rate on the whole profit picked by tier (a blended rate between the
    /// limits), and dividend bands are sized off the income tax limits.
    #[default]
    Reference,
    /// Corporation tax with marginal relief, and dividends stacked on top of
    /// the salary through the income tax bands.
    Statutory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxYearConfig {
    pub tax_year: TaxYear,

    pub personal_allowance: f64,
    pub basic_rate: f64,
    pub basic_rate_limit: f64,
    pub higher_rate: f64,
    pub higher_rate_limit: f64,
    pub additional_rate: f64,

    pub ni_primary_threshold: f64,
    pub ni_upper_earnings_limit: f64,
    pub ni_employee_rate: f64,
    pub ni_employee_upper_rate: f64,
    /// Applied as `threshold * 12` against annual pay.
    pub ni_secondary_threshold: f64,
    pub ni_employer_rate: f64,

    pub dividend_allowance: f64,
    pub dividend_basic_rate: f64,
    pub dividend_higher_rate: f64,
    pub dividend_additional_rate: f64,

    pub corp_tax_small_rate: f64,
    pub corp_tax_main_rate: f64,
    pub corp_tax_marginal_rate: f64,
    pub small_profits_limit: f64,
    pub main_rate_limit: f64,
    #[serde(default)]
    pub calculation_method: CalculationMethod,

    pub umbrella_weekly_fee: f64,
    pub expenses_allowance_rate: f64,
    pub company_expenses: f64,
    pub working_weeks: f64,
}

impl Default for TaxYearConfig {
    fn default() -> Self {
        Self::uk_2024_25()
    }
}

impl TaxYearConfig {
    pub fn uk_2024_25() -> Self {
        Self {
            tax_year: TaxYear(2025),
            personal_allowance: 12_570.0,
            basic_rate: 0.20,
            basic_rate_limit: 50_270.0,
            higher_rate: 0.40,
            higher_rate_limit: 125_140.0,
            additional_rate: 0.45,
            ni_primary_threshold: 12_570.0,
            ni_upper_earnings_limit: 50_270.0,
            ni_employee_rate: 0.08,
            ni_employee_upper_rate: 0.02,
            ni_secondary_threshold: 9_100.0,
            ni_employer_rate: 0.138,
            dividend_allowance: 500.0,
            dividend_basic_rate: 0.0875,
            dividend_higher_rate: 0.3375,
            dividend_additional_rate: 0.3935,
            corp_tax_small_rate: 0.19,
            corp_tax_main_rate: 0.25,
            corp_tax_marginal_rate: 0.265,
            small_profits_limit: 50_000.0,
            main_rate_limit: 250_000.0,
            calculation_method: CalculationMethod::Reference,
            umbrella_weekly_fee: 25.0,
            expenses_allowance_rate: 0.05,
            company_expenses: 3_000.0,
            working_weeks: 48.0,
        }
    }

    pub fn uk_2025_26() -> Self {
        Self {
            tax_year: TaxYear(2026),
            ni_secondary_threshold: 5_000.0,
            ni_employer_rate: 0.15,
            ..Self::uk_2024_25()
        }
    }

    pub fn with_calculation_method(mut self, method: CalculationMethod) -> Self {
        self.calculation_method = method;
        self
    }

    /// Fraction used by the marginal relief taper; 3/200 for the 2023 onwards limits.
    pub fn marginal_relief_fraction(&self) -> f64 {
        let band = self.main_rate_limit - self.small_profits_limit;
        if band <= 0.0 {
            return 0.0;
        }
        (self.corp_tax_main_rate - self.corp_tax_small_rate) * self.small_profits_limit / band
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        let year = self.tax_year;
        let err = |msg: String| Err(CalcError::Configuration(format!("{year}: {msg}")));

        for (name, rate) in [
            ("basicRate", self.basic_rate),
            ("higherRate", self.higher_rate),
            ("additionalRate", self.additional_rate),
            ("niEmployeeRate", self.ni_employee_rate),
            ("niEmployeeUpperRate", self.ni_employee_upper_rate),
            ("niEmployerRate", self.ni_employer_rate),
            ("dividendBasicRate", self.dividend_basic_rate),
            ("dividendHigherRate", self.dividend_higher_rate),
            ("dividendAdditionalRate", self.dividend_additional_rate),
            ("corpTaxSmallRate", self.corp_tax_small_rate),
            ("corpTaxMainRate", self.corp_tax_main_rate),
            ("corpTaxMarginalRate", self.corp_tax_marginal_rate),
            ("expensesAllowanceRate", self.expenses_allowance_rate),
        ] {
            if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                return err(format!("{name} must be between 0 and 1"));
            }
        }

        for (name, amount) in [
            ("personalAllowance", self.personal_allowance),
            ("basicRateLimit", self.basic_rate_limit),
            ("higherRateLimit", self.higher_rate_limit),
            ("niPrimaryThreshold", self.ni_primary_threshold),
            ("niUpperEarningsLimit", self.ni_upper_earnings_limit),
            ("niSecondaryThreshold", self.ni_secondary_threshold),
            ("dividendAllowance", self.dividend_allowance),
            ("smallProfitsLimit", self.small_profits_limit),
            ("mainRateLimit", self.main_rate_limit),
            ("umbrellaWeeklyFee", self.umbrella_weekly_fee),
            ("companyExpenses", self.company_expenses),
        ] {
            if !amount.is_finite() || amount < 0.0 {
                return err(format!("{name} must be >= 0"));
            }
        }

        if self.basic_rate_limit < self.personal_allowance {
            return err("basicRateLimit must be >= personalAllowance".to_string());
        }
        if self.higher_rate_limit < self.basic_rate_limit {
            return err("higherRateLimit must be >= basicRateLimit".to_string());
        }
        if self.ni_upper_earnings_limit < self.ni_primary_threshold {
            return err("niUpperEarningsLimit must be >= niPrimaryThreshold".to_string());
        }
        if self.main_rate_limit <= self.small_profits_limit {
            return err("mainRateLimit must be > smallProfitsLimit".to_string());
        }
        if !self.working_weeks.is_finite() || self.working_weeks <= 0.0 || self.working_weeks > 52.0
        {
            return err("workingWeeks must be in (0, 52]".to_string());
        }

        Ok(())
    }

    /// Reads a single config from a JSON file and validates it.
    pub fn load_from_path(path: &Path) -> Result<Self, CalcError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CalcError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TaxYearConfig =
            serde_json::from_str(&raw).map_err(|source| CalcError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        info!(tax_year = %config.tax_year, path = %path.display(), "loaded tax year config");
        Ok(config)
    }
}

/// Validated tax-year configs keyed by year.
#[derive(Debug, Clone)]
pub struct TaxConfigRegistry {
    configs: BTreeMap<TaxYear, TaxYearConfig>,
    default_year: TaxYear,
}

impl TaxConfigRegistry {
    pub fn builtin() -> Self {
        let reference = TaxYearConfig::uk_2024_25();
        let default_year = reference.tax_year;
        let mut configs = BTreeMap::new();
        for config in [reference, TaxYearConfig::uk_2025_26()] {
            configs.insert(config.tax_year, config);
        }
        Self {
            configs,
            default_year,
        }
    }

    /// Adds or replaces a year. The inserted year becomes the default.
    pub fn insert(&mut self, config: TaxYearConfig) -> Result<(), CalcError> {
        config.validate()?;
        self.default_year = config.tax_year;
        self.configs.insert(config.tax_year, config);
        Ok(())
    }

    pub fn get(&self, year: TaxYear) -> Result<&TaxYearConfig, CalcError> {
        self.configs
            .get(&year)
            .ok_or_else(|| CalcError::UnknownTaxYear(year.to_string()))
    }

    /// Looks up `year`, or the default year when `None`.
    pub fn resolve(&self, year: Option<TaxYear>) -> Result<&TaxYearConfig, CalcError> {
        self.get(year.unwrap_or(self.default_year))
    }

    pub fn default_year(&self) -> TaxYear {
        self.default_year
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxYearConfig> {
        self.configs.values()
    }
}

impl Default for TaxConfigRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
