use serde::{Deserialize, Serialize};

use super::config::TaxYear;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    #[serde(alias = "insideIr35", alias = "inside_ir35", alias = "inside-ir35")]
    Inside,
    #[serde(alias = "outsideIr35", alias = "outside_ir35", alias = "outside-ir35")]
    Outside,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementInputs {
    pub day_rate: f64,
    pub days_per_week: f64,
    pub weeks_per_year: f64,
}

impl EngagementInputs {
    pub fn new(day_rate: f64, days_per_week: f64, weeks_per_year: f64) -> Self {
        Self {
            day_rate,
            days_per_week,
            weeks_per_year,
        }
    }

    pub fn with_day_rate(self, day_rate: f64) -> Self {
        Self { day_rate, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsideIr35Result {
    pub gross_annual: f64,
    pub umbrella_margin: f64,
    pub employer_ni: f64,
    pub expenses_allowance: f64,
    pub taxable_gross: f64,
    pub income_tax: f64,
    pub employee_ni: f64,
    pub total_tax: f64,
    pub take_home: f64,
    pub effective_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutsideIr35Result {
    pub gross_annual: f64,
    pub salary: f64,
    pub company_expenses: f64,
    pub company_profit: f64,
    pub corporation_tax: f64,
    pub available_for_dividends: f64,
    pub dividend_tax: f64,
    pub total_tax: f64,
    pub take_home: f64,
    pub effective_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub tax_year: TaxYear,
    pub gross_annual: f64,
    pub inside: InsideIr35Result,
    pub outside: OutsideIr35Result,
    /// Outside take-home minus inside take-home.
    pub difference: f64,
    /// `None` when the inside take-home is not positive.
    pub percentage_saved: Option<f64>,
}

impl Comparison {
    pub fn take_home(&self, route: Route) -> f64 {
        match route {
            Route::Inside => self.inside.take_home,
            Route::Outside => self.outside.take_home,
        }
    }
}
