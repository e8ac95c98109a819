pub mod cli;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    CalcError, CalculationMethod, Comparison, ComparisonCache, DayRateSolveResult,
    EngagementInputs, Route, SolveConfig, TaxConfigRegistry, TaxYear, TaxYearConfig,
    equivalent_inside_day_rate, solve_day_rate,
};
use crate::locale::{
    Currency, FormattedComparison, Locale, RoleDefaults, convert_currency, format_comparison,
    role_defaults, roles_for_locale,
};

/// Day rate used when neither a rate nor a role is given.
pub const DEFAULT_DAY_RATE: f64 = 800.0;
pub const DEFAULT_DAYS_PER_WEEK: f64 = 4.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCalculationMethod {
    #[serde(alias = "blended", alias = "widget")]
    Reference,
    #[serde(alias = "marginal-relief", alias = "marginalRelief", alias = "hmrc")]
    Statutory,
}

impl From<ApiCalculationMethod> for CalculationMethod {
    fn from(value: ApiCalculationMethod) -> Self {
        match value {
            ApiCalculationMethod::Reference => CalculationMethod::Reference,
            ApiCalculationMethod::Statutory => CalculationMethod::Statutory,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    day_rate: Option<f64>,
    role: Option<String>,
    days_per_week: Option<f64>,
    weeks_per_year: Option<f64>,
    tax_year: Option<String>,
    calculation_method: Option<ApiCalculationMethod>,
    locale: Option<Locale>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    day_rate: Option<f64>,
    role: Option<String>,
    days_per_week: Option<f64>,
    weeks_per_year: Option<f64>,
    tax_year: Option<String>,
    calculation_method: Option<ApiCalculationMethod>,
    target_take_home: Option<f64>,
    route: Option<Route>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

impl SolvePayload {
    fn engagement(&self) -> ComparePayload {
        ComparePayload {
            day_rate: self.day_rate,
            role: self.role.clone(),
            days_per_week: self.days_per_week,
            weeks_per_year: self.weeks_per_year,
            tax_year: self.tax_year.clone(),
            calculation_method: self.calculation_method,
            locale: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RolesQuery {
    locale: Option<Locale>,
}

#[derive(Debug)]
struct CompareRequest {
    inputs: EngagementInputs,
    config: TaxYearConfig,
    locale: Option<Locale>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    inputs: EngagementInputs,
    calculation_method: CalculationMethod,
    #[serde(flatten)]
    comparison: Comparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted: Option<FormattedComparison>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    tax_year: TaxYear,
    calculation_method: CalculationMethod,
    #[serde(flatten)]
    result: DayRateSolveResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxYearsResponse<'a> {
    default_year: TaxYear,
    tax_years: Vec<&'a TaxYearConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleEntry {
    key: &'static str,
    #[serde(flatten)]
    defaults: RoleDefaults,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RolesResponse {
    locale: Locale,
    currency: Currency,
    roles: Vec<RoleEntry>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared by every request: the configured tax years and the comparison memo.
#[derive(Debug)]
pub struct AppState {
    registry: TaxConfigRegistry,
    cache: Mutex<ComparisonCache>,
}

impl AppState {
    pub fn new(registry: TaxConfigRegistry) -> Self {
        Self {
            registry,
            cache: Mutex::new(ComparisonCache::default()),
        }
    }

    fn compare(&self, request: &CompareRequest) -> Result<Comparison, CalcError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get_or_compute(&request.inputs, &request.config)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/compare", get(compare_get_handler).post(compare_post_handler))
        .route("/api/solve", get(solve_get_handler).post(solve_post_handler))
        .route("/api/tax-years", get(tax_years_handler))
        .route("/api/roles", get(roles_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, registry: TaxConfigRegistry) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let default_year = registry.default_year();
    let app = build_router(Arc::new(AppState::new(registry)));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, %default_year, "IR35 HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/compare");

    axum::serve(listener, app).await
}

/// Explicit day rate, else the role's market rate in sterling, else the default.
pub fn resolve_day_rate(day_rate: Option<f64>, role: Option<&str>, locale: Locale) -> f64 {
    if let Some(rate) = day_rate {
        return rate;
    }
    match role {
        Some(role) => convert_currency(
            role_defaults(locale, role).avg_day_rate,
            locale.currency(),
            Currency::Gbp,
        ),
        None => DEFAULT_DAY_RATE,
    }
}

/// Picks the year's config and applies the method override.
pub fn resolve_config(
    registry: &TaxConfigRegistry,
    tax_year: Option<&str>,
    method: Option<CalculationMethod>,
) -> Result<TaxYearConfig, CalcError> {
    let year = tax_year.map(str::parse::<TaxYear>).transpose()?;
    let config = registry.resolve(year)?.clone();
    Ok(match method {
        Some(method) => config.with_calculation_method(method),
        None => config,
    })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compare_get_handler(
    State(state): State<Arc<AppState>>,
    Query(payload): Query<ComparePayload>,
) -> Response {
    compare_handler_impl(&state, payload)
}

async fn compare_post_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ComparePayload>,
) -> Response {
    compare_handler_impl(&state, payload)
}

fn compare_handler_impl(state: &AppState, payload: ComparePayload) -> Response {
    let request = match compare_request_from_payload(payload, &state.registry) {
        Ok(request) => request,
        Err(err) => return rejected(err),
    };

    match state.compare(&request) {
        Ok(comparison) => json_response(
            StatusCode::OK,
            build_compare_response(&request, comparison),
        ),
        Err(err) => rejected(err),
    }
}

async fn solve_get_handler(
    State(state): State<Arc<AppState>>,
    Query(payload): Query<SolvePayload>,
) -> Response {
    solve_handler_impl(&state, payload)
}

async fn solve_post_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SolvePayload>,
) -> Response {
    solve_handler_impl(&state, payload)
}

fn solve_handler_impl(state: &AppState, payload: SolvePayload) -> Response {
    let defaults = SolveConfig::default();
    let solve = SolveConfig {
        search_min: payload.search_min.unwrap_or(defaults.search_min),
        search_max: payload.search_max.unwrap_or(defaults.search_max),
        tolerance: payload.tolerance.unwrap_or(defaults.tolerance),
        max_iterations: payload.max_iterations.unwrap_or(defaults.max_iterations),
    };
    let target = payload.target_take_home;
    let route = payload.route.unwrap_or(Route::Inside);

    let request = match compare_request_from_payload(payload.engagement(), &state.registry) {
        Ok(request) => request,
        Err(err) => return rejected(err),
    };

    let result = match target {
        Some(target) => solve_day_rate(
            route,
            target,
            request.inputs.days_per_week,
            request.inputs.weeks_per_year,
            &request.config,
            solve,
        ),
        None => equivalent_inside_day_rate(&request.inputs, &request.config, solve),
    };

    match result {
        Ok(result) => json_response(
            StatusCode::OK,
            SolveResponse {
                tax_year: request.config.tax_year,
                calculation_method: request.config.calculation_method,
                result,
            },
        ),
        Err(err) => rejected(err),
    }
}

async fn tax_years_handler(State(state): State<Arc<AppState>>) -> Response {
    json_response(
        StatusCode::OK,
        TaxYearsResponse {
            default_year: state.registry.default_year(),
            tax_years: state.registry.iter().collect(),
        },
    )
}

async fn roles_handler(Query(query): Query<RolesQuery>) -> Response {
    let locale = query.locale.unwrap_or_default();
    let roles = roles_for_locale(locale)
        .into_iter()
        .map(|(key, defaults)| RoleEntry { key, defaults })
        .collect();
    json_response(
        StatusCode::OK,
        RolesResponse {
            locale,
            currency: locale.currency(),
            roles,
        },
    )
}

fn rejected(err: CalcError) -> Response {
    warn!(error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn compare_request_from_payload(
    payload: ComparePayload,
    registry: &TaxConfigRegistry,
) -> Result<CompareRequest, CalcError> {
    let config = resolve_config(
        registry,
        payload.tax_year.as_deref(),
        payload.calculation_method.map(Into::into),
    )?;
    let rate_locale = payload.locale.unwrap_or_default();
    let inputs = EngagementInputs::new(
        resolve_day_rate(payload.day_rate, payload.role.as_deref(), rate_locale),
        payload.days_per_week.unwrap_or(DEFAULT_DAYS_PER_WEEK),
        payload.weeks_per_year.unwrap_or(config.working_weeks),
    );

    Ok(CompareRequest {
        inputs,
        config,
        locale: payload.locale,
    })
}

fn build_compare_response(request: &CompareRequest, comparison: Comparison) -> CompareResponse {
    let formatted = request
        .locale
        .map(|locale| format_comparison(&comparison, locale));
    CompareResponse {
        inputs: request.inputs,
        calculation_method: request.config.calculation_method,
        comparison,
        formatted,
    }
}

#[cfg(test)]
fn compare_request_from_json(json: &str) -> Result<CompareRequest, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    compare_request_from_payload(payload, &TaxConfigRegistry::builtin()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn test_router() -> Router {
        build_router(Arc::new(AppState::new(TaxConfigRegistry::builtin())))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = test_router().oneshot(request).await.expect("router responds");
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body = serde_json::from_slice(&bytes).expect("json body");
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request")
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("valid request")
    }

    #[test]
    fn compare_request_applies_defaults() {
        let request = compare_request_from_json("{}").expect("valid payload");
        assert_approx(request.inputs.day_rate, DEFAULT_DAY_RATE);
        assert_approx(request.inputs.days_per_week, DEFAULT_DAYS_PER_WEEK);
        assert_approx(request.inputs.weeks_per_year, 48.0);
        assert_eq!(request.config.tax_year, TaxYear(2025));
        assert_eq!(request.config.calculation_method, CalculationMethod::Reference);
        assert!(request.locale.is_none());
    }

    #[test]
    fn compare_request_parses_web_keys() {
        let request = compare_request_from_json(
            r#"{
                "dayRate": 950,
                "daysPerWeek": 2.5,
                "weeksPerYear": 44,
                "taxYear": "2025/26",
                "calculationMethod": "marginalRelief",
                "locale": "us"
            }"#,
        )
        .expect("valid payload");

        assert_approx(request.inputs.day_rate, 950.0);
        assert_approx(request.inputs.days_per_week, 2.5);
        assert_approx(request.inputs.weeks_per_year, 44.0);
        assert_eq!(request.config.tax_year, TaxYear(2026));
        assert_eq!(request.config.calculation_method, CalculationMethod::Statutory);
        assert_eq!(request.locale, Some(Locale::Us));
    }

    #[test]
    fn compare_request_uses_role_rate_in_sterling() {
        let request =
            compare_request_from_json(r#"{"role": "ciso", "locale": "us"}"#).expect("valid");
        assert_approx(request.inputs.day_rate, (1_650.0f64 / 1.27).round());

        let request = compare_request_from_json(r#"{"role": "cto"}"#).expect("valid");
        assert_approx(request.inputs.day_rate, 1_050.0);
    }

    #[test]
    fn compare_request_rejects_unknown_tax_year() {
        let err = compare_request_from_json(r#"{"taxYear": "1987/88"}"#).expect_err("unknown");
        assert!(err.contains("unknown tax year"));
    }

    #[test]
    fn compare_request_rejects_unknown_method() {
        let err = compare_request_from_json(r#"{"calculationMethod": "guesswork"}"#)
            .expect_err("unknown method");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[tokio::test]
    async fn compare_get_returns_comparison_json() {
        let (status, body) =
            send(get("/api/compare?dayRate=800&daysPerWeek=4&weeksPerYear=48")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["taxYear"], "2024/25");
        assert_eq!(body["calculationMethod"], "reference");
        assert_approx(body["grossAnnual"].as_f64().expect("number"), 153_600.0);
        assert_approx(body["inside"]["takeHome"].as_f64().expect("number"), 98_036.352);
        assert!(body["outside"]["corporationTax"].is_number());
        assert!(body["percentageSaved"].is_number());
        assert!(body.get("formatted").is_none());
    }

    #[tokio::test]
    async fn compare_post_with_locale_includes_formatted_strings() {
        let (status, body) = send(post_json(
            "/api/compare",
            r#"{"dayRate": 800, "daysPerWeek": 4, "weeksPerYear": 48, "locale": "uk"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["formatted"]["grossAnnual"], "£153,600");
        assert_eq!(body["formatted"]["locale"], "uk");
    }

    #[tokio::test]
    async fn compare_degenerate_result_has_null_percentage() {
        let (status, body) =
            send(get("/api/compare?dayRate=10&daysPerWeek=1&weeksPerYear=48")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["percentageSaved"].is_null());
        assert!(body["difference"].is_number());
    }

    #[tokio::test]
    async fn compare_invalid_input_is_bad_request() {
        let (status, body) = send(get("/api/compare?dayRate=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().expect("error message");
        assert!(error.contains("dayRate"));

        let (status, body) = send(get("/api/compare?weeksPerYear=60")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error message").contains("weeksPerYear"));
    }

    #[tokio::test]
    async fn solve_without_target_finds_equivalent_inside_rate() {
        let (status, body) =
            send(get("/api/solve?dayRate=800&daysPerWeek=4&weeksPerYear=48")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["route"], "inside");
        assert_eq!(body["feasible"], true);
        let rate = body["solvedDayRate"].as_f64().expect("solved rate");
        assert!(rate > 0.0 && rate < 800.0);
    }

    #[tokio::test]
    async fn solve_with_target_uses_requested_route() {
        let (status, body) = send(post_json(
            "/api/solve",
            r#"{
                "targetTakeHome": 60000,
                "route": "outside",
                "daysPerWeek": 3,
                "calculationMethod": "statutory"
            }"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["route"], "outside");
        assert_eq!(body["calculationMethod"], "statutory");
        assert!(body["achievedTakeHome"].as_f64().expect("take-home") >= 60_000.0);
    }

    #[tokio::test]
    async fn solve_rejects_bad_bounds() {
        let (status, body) = send(get("/api/solve?searchMin=10&searchMax=5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("searchMax"));
    }

    #[tokio::test]
    async fn solve_rejects_oversized_iteration_limit() {
        let (status, body) =
            send(get("/api/solve?targetTakeHome=60000&maxIterations=4294967295")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("maxIterations"));

        let (status, body) = send(post_json(
            "/api/solve",
            r#"{"targetTakeHome": 60000, "maxIterations": 1001}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("maxIterations"));
    }

    #[tokio::test]
    async fn tax_years_lists_builtin_configs() {
        let (status, body) = send(get("/api/tax-years")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["defaultYear"], "2024/25");
        let years = body["taxYears"].as_array().expect("array");
        assert_eq!(years.len(), 2);
        assert_eq!(years[1]["taxYear"], "2025/26");
        assert_approx(years[1]["niEmployerRate"].as_f64().expect("rate"), 0.15);
    }

    #[tokio::test]
    async fn roles_lists_locale_rates() {
        let (status, body) = send(get("/api/roles?locale=au")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currency"], "AUD");
        let roles = body["roles"].as_array().expect("array");
        assert_eq!(roles.len(), 9);
        assert_eq!(roles[0]["key"], "cmo");
        assert_approx(roles[0]["avgDayRate"].as_f64().expect("rate"), 1_600.0);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, body) = send(get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[test]
    fn repeated_compare_hits_cache() {
        let state = AppState::new(TaxConfigRegistry::builtin());
        let request = compare_request_from_json(r#"{"dayRate": 700}"#).expect("valid");
        let first = state.compare(&request).expect("valid");
        let second = state.compare(&request).expect("valid");
        assert_eq!(first, second);
        let cache = state.cache.lock().expect("cache lock");
        assert_eq!(cache.hits(), 1);
    }
}
