use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use super::{DEFAULT_DAYS_PER_WEEK, resolve_config, resolve_day_rate};
use crate::core::{
    CalcError, CalculationMethod, Comparison, DayRateSolveResult, EngagementInputs, Route,
    SolveConfig, TaxConfigRegistry, TaxYearConfig, compute_tax_comparison,
    equivalent_inside_day_rate, solve_day_rate,
};
use crate::locale::{
    FormatOptions, Locale, format_comparison, format_currency, format_day_rate_range,
    format_salary, roles_for_locale,
};

/// Environment variable naming an extra tax-year config file.
pub const TAX_CONFIG_ENV: &str = "IR35_TAX_CONFIG";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCalculationMethod {
    Reference,
    Statutory,
}

impl From<CliCalculationMethod> for CalculationMethod {
    fn from(value: CliCalculationMethod) -> Self {
        match value {
            CliCalculationMethod::Reference => CalculationMethod::Reference,
            CliCalculationMethod::Statutory => CalculationMethod::Statutory,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRoute {
    Inside,
    Outside,
}

impl From<CliRoute> for Route {
    fn from(value: CliRoute) -> Self {
        match value {
            CliRoute::Inside => Route::Inside,
            CliRoute::Outside => Route::Outside,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "ir35",
    about = "UK IR35 take-home comparison (umbrella PAYE vs limited company dividends)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "JSON tax year config to load on top of the built-in years; becomes the default year"
    )]
    pub tax_config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare inside and outside IR35 take-home for one engagement
    Compare(CompareArgs),
    /// Find the day rate that reaches a take-home target
    Solve(SolveArgs),
    /// List the configured tax years
    TaxYears,
    /// List market day rates per role for a locale
    Roles {
        #[arg(long, default_value = "uk")]
        locale: Locale,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct EngagementArgs {
    #[arg(long, help = "Contract day rate in GBP")]
    day_rate: Option<f64>,
    #[arg(
        long,
        help = "Use the market average day rate for a role: cmo, cfo, cto, coo, ciso, chro, ..."
    )]
    role: Option<String>,
    #[arg(long, default_value_t = DEFAULT_DAYS_PER_WEEK)]
    days_per_week: f64,
    #[arg(long, help = "Working weeks per year, defaults to the tax year's working weeks")]
    weeks_per_year: Option<f64>,
    #[arg(
        long,
        help = "Tax year, e.g. 2024/25; defaults to 2024/25, or to the year of --tax-config"
    )]
    tax_year: Option<String>,
    #[arg(
        long,
        value_enum,
        help = "Calculation method: reference figures or statutory marginal relief"
    )]
    method: Option<CliCalculationMethod>,
    #[arg(long, default_value = "uk", help = "Locale for role rates and display currency")]
    locale: Locale,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    engagement: EngagementArgs,
    #[arg(long, help = "Print the comparison as JSON")]
    json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    engagement: EngagementArgs,
    #[arg(
        long,
        help = "Annual take-home target; omit to match the outside take-home inside IR35"
    )]
    target: Option<f64>,
    #[arg(long, value_enum, default_value_t = CliRoute::Inside)]
    route: CliRoute,
    #[arg(long, default_value_t = 1.0)]
    search_min: f64,
    #[arg(long, default_value_t = 10_000.0)]
    search_max: f64,
    #[arg(long, default_value_t = 0.01, help = "Stop once the day rate bracket is this narrow")]
    tolerance: f64,
    #[arg(long, default_value_t = 64)]
    max_iterations: u32,
    #[arg(long, help = "Print the solver result as JSON")]
    json: bool,
}

/// Built-in years plus the file from `--tax-config`, or from the environment.
pub fn load_registry(tax_config: Option<&Path>) -> Result<TaxConfigRegistry, CalcError> {
    let mut registry = TaxConfigRegistry::builtin();
    let env_path = std::env::var_os(TAX_CONFIG_ENV).map(PathBuf::from);
    if let Some(path) = tax_config.or(env_path.as_deref()) {
        registry.insert(TaxYearConfig::load_from_path(path)?)?;
    }
    Ok(registry)
}

/// Runs every command except `serve` and returns what should be printed.
pub fn run_command(command: &Command, registry: &TaxConfigRegistry) -> Result<String, CalcError> {
    match command {
        Command::Compare(args) => run_compare(args, registry),
        Command::Solve(args) => run_solve(args, registry),
        Command::TaxYears => Ok(render_tax_years(registry)),
        Command::Roles { locale } => Ok(render_roles(*locale)),
        Command::Serve { .. } => Err(CalcError::invalid("command", "serve runs the HTTP server")),
    }
}

fn build_engagement(
    args: &EngagementArgs,
    registry: &TaxConfigRegistry,
) -> Result<(EngagementInputs, TaxYearConfig), CalcError> {
    let config = resolve_config(
        registry,
        args.tax_year.as_deref(),
        args.method.map(Into::into),
    )?;
    let inputs = EngagementInputs::new(
        resolve_day_rate(args.day_rate, args.role.as_deref(), args.locale),
        args.days_per_week,
        args.weeks_per_year.unwrap_or(config.working_weeks),
    );
    Ok((inputs, config))
}

fn run_compare(args: &CompareArgs, registry: &TaxConfigRegistry) -> Result<String, CalcError> {
    let (inputs, config) = build_engagement(&args.engagement, registry)?;
    let comparison = compute_tax_comparison(&inputs, &config)?;

    if args.json {
        return to_json(&comparison);
    }
    Ok(render_comparison(
        &inputs,
        &config,
        &comparison,
        args.engagement.locale,
    ))
}

fn run_solve(args: &SolveArgs, registry: &TaxConfigRegistry) -> Result<String, CalcError> {
    let (inputs, config) = build_engagement(&args.engagement, registry)?;
    let solve = SolveConfig {
        search_min: args.search_min,
        search_max: args.search_max,
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
    };

    let result = match args.target {
        Some(target) => solve_day_rate(
            args.route.into(),
            target,
            inputs.days_per_week,
            inputs.weeks_per_year,
            &config,
            solve,
        )?,
        None => equivalent_inside_day_rate(&inputs, &config, solve)?,
    };

    if args.json {
        return to_json(&result);
    }
    Ok(render_solve(&result))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CalcError> {
    serde_json::to_string_pretty(value).map_err(CalcError::Output)
}

fn gbp(amount: f64) -> String {
    format_currency(amount, Locale::Uk, FormatOptions::default())
}

fn row(label: &str, value: String) -> String {
    format!("  {label:<26}{value:>14}")
}

fn render_comparison(
    inputs: &EngagementInputs,
    config: &TaxYearConfig,
    comparison: &Comparison,
    locale: Locale,
) -> String {
    let inside = &comparison.inside;
    let outside = &comparison.outside;
    let mut lines = vec![
        format!(
            "Tax year {} ({:?}): {}/day x {} days x {} weeks = {}",
            config.tax_year,
            config.calculation_method,
            gbp(inputs.day_rate),
            inputs.days_per_week,
            inputs.weeks_per_year,
            gbp(comparison.gross_annual)
        ),
        String::new(),
        "Inside IR35 (umbrella)".to_string(),
        row("Umbrella margin", gbp(inside.umbrella_margin)),
        row("Employer NI", gbp(inside.employer_ni)),
        row("Expenses allowance", gbp(inside.expenses_allowance)),
        row("Taxable gross", gbp(inside.taxable_gross)),
        row("Income tax", gbp(inside.income_tax)),
        row("Employee NI", gbp(inside.employee_ni)),
        row("Take-home", gbp(inside.take_home)),
        row("Effective rate", format!("{:.1}%", inside.effective_rate)),
        String::new(),
        "Outside IR35 (limited company)".to_string(),
        row("Salary", gbp(outside.salary)),
        row("Company expenses", gbp(outside.company_expenses)),
        row("Company profit", gbp(outside.company_profit)),
        row("Corporation tax", gbp(outside.corporation_tax)),
        row("Available for dividends", gbp(outside.available_for_dividends)),
        row("Dividend tax", gbp(outside.dividend_tax)),
        row("Take-home", gbp(outside.take_home)),
        row("Effective rate", format!("{:.1}%", outside.effective_rate)),
        String::new(),
    ];

    let formatted = format_comparison(comparison, locale);
    lines.push(row("Difference (outside)", formatted.difference));
    lines.push(row("Percentage saved", formatted.percentage_saved));
    if locale != Locale::Uk {
        lines.push(format!(
            "  In {}: inside {}, outside {}",
            locale.currency().code(),
            formatted.inside_take_home,
            formatted.outside_take_home
        ));
    }
    lines.join("\n")
}

fn render_solve(result: &DayRateSolveResult) -> String {
    let mut lines = vec![format!(
        "{:?} route, target {} at {} days x {} weeks",
        result.route,
        gbp(result.target_take_home),
        result.days_per_week,
        result.weeks_per_year
    )];
    if let (Some(rate), Some(take_home)) = (result.solved_day_rate, result.achieved_take_home) {
        lines.push(row("Day rate", format!("£{rate:.2}")));
        lines.push(row("Take-home", gbp(take_home)));
    }
    lines.push(format!(
        "  {} ({} iterations)",
        result.message,
        result.iterations.len()
    ));
    lines.join("\n")
}

fn render_tax_years(registry: &TaxConfigRegistry) -> String {
    registry
        .iter()
        .map(|config| {
            let marker = if config.tax_year == registry.default_year() {
                "*"
            } else {
                " "
            };
            format!(
                "{marker} {}  PA {}  employer NI {:.1}% over {}  corp tax {:.0}%/{:.0}%",
                config.tax_year,
                gbp(config.personal_allowance),
                config.ni_employer_rate * 100.0,
                gbp(config.ni_secondary_threshold * 12.0),
                config.corp_tax_small_rate * 100.0,
                config.corp_tax_main_rate * 100.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_roles(locale: Locale) -> String {
    let mut lines = vec![format!("{} ({})", locale.name(), locale.currency().code())];
    for (key, defaults) in roles_for_locale(locale) {
        lines.push(format!(
            "  {key:<5} {:<5} {:>10}/day  {:>24}  salary {}",
            defaults.label,
            format_currency(defaults.avg_day_rate, locale, FormatOptions::default()),
            format_day_rate_range(defaults.min_day_rate, defaults.max_day_rate, locale, false),
            format_salary(defaults.avg_salary, locale, false)
        ));
    }
    lines.join("\n")
}
