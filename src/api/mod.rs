use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    Debt, FullCalculation, MonthlyTraceRow, PayoffPlan, PortfolioTotals, Strategy, Warning,
    display_name, format_months, portfolio_totals, run_full_calculation, run_monthly_trace,
    validate_debts,
};

const NO_VALID_DEBTS: &str = "Add at least one debt with a balance and a minimum payment";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("--debt expects NAME:BALANCE:RATE:MIN_PAYMENT, got `{0}`")]
    MalformedDebt(String),
    #[error("debt {index} ({name}): {field} must be a finite number >= 0")]
    InvalidAmount {
        index: usize,
        name: String,
        field: &'static str,
    },
    #[error("debt id {0} is used more than once")]
    DuplicateId(u64),
    #[error("debt {0} has no id and none is left after the largest id given")]
    IdsExhausted(usize),
    #[error("--extra-payment must be a finite number >= 0")]
    InvalidExtraPayment,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Add at least one debt with a balance and a minimum payment")]
    NoValidDebts,
    #[error("failed to render JSON report: {0}")]
    Render(#[from] serde_json::Error),
    #[error("failed to render text report")]
    Format(#[from] fmt::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliStrategy {
    Snowball,
    Avalanche,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Snowball => Strategy::Snowball,
            CliStrategy::Avalanche => Strategy::Avalanche,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStrategy {
    #[serde(alias = "Snowball", alias = "lowest-balance", alias = "lowestBalance")]
    Snowball,
    #[serde(alias = "Avalanche", alias = "highest-rate", alias = "highestRate")]
    Avalanche,
}

impl From<ApiStrategy> for CliStrategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Snowball => CliStrategy::Snowball,
            ApiStrategy::Avalanche => CliStrategy::Avalanche,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtArg {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    pub balance: f64,
    pub rate: f64,
    pub min_payment: f64,
}

fn parse_debt_arg(raw: &str) -> Result<DebtArg, InputError> {
    let malformed = || InputError::MalformedDebt(raw.to_string());
    // Split from the right so names may contain ':'.
    let mut parts = raw.rsplitn(4, ':');
    let min_payment = parts.next().ok_or_else(malformed)?;
    let rate = parts.next().ok_or_else(malformed)?;
    let balance = parts.next().ok_or_else(malformed)?;
    let name = parts.next().ok_or_else(malformed)?;

    let number = |s: &str| s.trim().parse::<f64>().map_err(|_| malformed());
    Ok(DebtArg {
        id: None,
        name: name.trim().to_string(),
        balance: number(balance)?,
        rate: number(rate.trim_end_matches('%'))?,
        min_payment: number(min_payment)?,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatePayload {
    debts: Option<Vec<DebtArg>>,
    strategy: Option<ApiStrategy>,
    extra_payment: Option<f64>,
    include_monthly_trace: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Debt payoff planner (snowball and avalanche strategies with extra monthly payments)"
)]
pub struct Cli {
    #[arg(
        long = "debt",
        value_parser = parse_debt_arg,
        help = "Debt as NAME:BALANCE:RATE:MIN_PAYMENT, rate in annual percent; repeat per debt. Defaults to a sample set"
    )]
    debts: Vec<DebtArg>,
    #[arg(long, value_enum, default_value_t = CliStrategy::Snowball)]
    strategy: CliStrategy,
    #[arg(
        long,
        default_value_t = 200.0,
        help = "Extra amount paid each month on top of all minimums"
    )]
    extra_payment: f64,
    #[arg(long, help = "Print the full report as JSON")]
    json: bool,
    #[arg(long, help = "Include every simulated month in the JSON report")]
    monthly_trace: bool,
}

#[derive(Debug)]
struct ApiRequest {
    plan: PayoffPlan,
    include_monthly_trace: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse {
    strategy: Strategy,
    extra_payment: f64,
    totals: PortfolioTotals,
    warnings: Vec<Warning>,
    #[serde(flatten)]
    calculation: FullCalculation,
    #[serde(skip_serializing_if = "Option::is_none")]
    monthly_trace: Option<Vec<MonthlyTraceRow>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    totals: PortfolioTotals,
    warnings: Vec<Warning>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn default_debts() -> Vec<DebtArg> {
    [
        ("Credit Card", 8_000.0, 22.99, 240.0),
        ("Car Loan", 3_000.0, 4.5, 300.0),
        ("Personal Loan", 5_000.0, 12.99, 150.0),
        ("Student Loan", 15_000.0, 6.5, 165.0),
    ]
    .into_iter()
    .map(|(name, balance, rate, min_payment)| DebtArg {
        id: None,
        name: name.to_string(),
        balance,
        rate,
        min_payment,
    })
    .collect()
}

fn default_cli_for_api() -> Cli {
    Cli {
        debts: default_debts(),
        strategy: CliStrategy::Snowball,
        extra_payment: 200.0,
        json: true,
        monthly_trace: false,
    }
}

fn build_plan(cli: Cli) -> Result<PayoffPlan, InputError> {
    if !cli.extra_payment.is_finite() || cli.extra_payment < 0.0 {
        return Err(InputError::InvalidExtraPayment);
    }

    let mut seen = HashSet::new();
    for id in cli.debts.iter().filter_map(|d| d.id) {
        if !seen.insert(id) {
            return Err(InputError::DuplicateId(id));
        }
    }

    let mut next_id = match seen.iter().max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    };
    let mut debts = Vec::with_capacity(cli.debts.len());
    for (idx, arg) in cli.debts.into_iter().enumerate() {
        for (field, value) in [
            ("balance", arg.balance),
            ("rate", arg.rate),
            ("minPayment", arg.min_payment),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InputError::InvalidAmount {
                    index: idx + 1,
                    name: display_name(&arg.name).to_string(),
                    field,
                });
            }
        }

        let id = match arg.id {
            Some(id) => id,
            None => {
                let id = next_id.ok_or(InputError::IdsExhausted(idx + 1))?;
                next_id = id.checked_add(1);
                id
            }
        };
        debts.push(Debt {
            id,
            name: arg.name,
            balance: arg.balance,
            rate: arg.rate,
            min_payment: arg.min_payment,
        });
    }

    Ok(PayoffPlan {
        debts,
        strategy: cli.strategy.into(),
        extra_payment: cli.extra_payment,
    })
}

pub fn run_cli(mut cli: Cli) -> Result<String, CliError> {
    if cli.debts.is_empty() {
        cli.debts = default_debts();
    }
    let json = cli.json;
    let include_monthly_trace = cli.monthly_trace;
    let plan = build_plan(cli)?;

    let response =
        build_calculate_response(&plan, include_monthly_trace).ok_or(CliError::NoValidDebts)?;
    if json {
        return Ok(serde_json::to_string_pretty(&response)?);
    }
    Ok(render_text_report(&response)?)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/calculate",
            get(calculate_get_handler).post(calculate_post_handler),
        )
        .route(
            "/api/validate",
            get(validate_get_handler).post(validate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("payoff HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/calculate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn calculate_get_handler(Query(payload): Query<CalculatePayload>) -> Response {
    calculate_handler_impl(payload)
}

async fn calculate_post_handler(Json(payload): Json<CalculatePayload>) -> Response {
    calculate_handler_impl(payload)
}

async fn validate_get_handler(Query(payload): Query<CalculatePayload>) -> Response {
    validate_handler_impl(payload)
}

async fn validate_post_handler(Json(payload): Json<CalculatePayload>) -> Response {
    validate_handler_impl(payload)
}

fn calculate_handler_impl(payload: CalculatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!("rejected calculate request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    match build_calculate_response(&request.plan, request.include_monthly_trace) {
        Some(response) => json_response(StatusCode::OK, response),
        None => error_response(StatusCode::UNPROCESSABLE_ENTITY, NO_VALID_DEBTS),
    }
}

fn validate_handler_impl(payload: CalculatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!("rejected validate request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let debts = &request.plan.debts;
    json_response(
        StatusCode::OK,
        ValidateResponse {
            totals: portfolio_totals(debts),
            warnings: validate_debts(debts),
        },
    )
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

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<CalculatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: CalculatePayload) -> Result<ApiRequest, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.debts {
        cli.debts = v;
    }
    if let Some(v) = payload.strategy {
        cli.strategy = v.into();
    }
    if let Some(v) = payload.extra_payment {
        cli.extra_payment = v;
    }
    let include_monthly_trace = payload.include_monthly_trace.unwrap_or(false);

    Ok(ApiRequest {
        plan: build_plan(cli)?,
        include_monthly_trace,
    })
}

fn build_calculate_response(
    plan: &PayoffPlan,
    include_monthly_trace: bool,
) -> Option<CalculateResponse> {
    let calculation = run_full_calculation(&plan.debts, plan.strategy, plan.extra_payment)?;
    let monthly_trace = include_monthly_trace
        .then(|| run_monthly_trace(&plan.debts, plan.strategy, plan.extra_payment));

    Some(CalculateResponse {
        strategy: plan.strategy,
        extra_payment: plan.extra_payment,
        totals: portfolio_totals(&plan.debts),
        warnings: validate_debts(&plan.debts),
        calculation,
        monthly_trace,
    })
}

fn render_text_report(response: &CalculateResponse) -> Result<String, fmt::Error> {
    let results = &response.calculation.results;
    let comparison = &response.calculation.comparison;
    let mut out = String::new();

    writeln!(out, "Debt Payoff Plan")?;
    writeln!(out, "Strategy: {}", response.strategy.label())?;
    writeln!(out, "Extra monthly payment: ${}", response.extra_payment)?;
    writeln!(out, "Monthly payment: ${:.0}", results.monthly_payment)?;
    writeln!(
        out,
        "Debt-free in: {} ({} months)",
        format_months(results.total_months),
        results.total_months
    )?;
    writeln!(out, "Total interest: ${:.0}", results.total_interest)?;
    writeln!(out, "Total paid: ${:.0}", results.total_paid)?;
    writeln!(
        out,
        "Versus minimum payments only: ${:.0} interest saved, {} months sooner",
        results.interest_saved, results.months_saved
    )?;

    writeln!(out)?;
    writeln!(out, "Payoff order:")?;
    for entry in &results.schedule {
        writeln!(
            out,
            "  {}. {} - ${:.0} at {}%, paid off month {}, interest ${:.0}",
            entry.order,
            display_name(&entry.name),
            entry.original_balance,
            entry.rate,
            entry.paid_off_month,
            entry.interest_paid
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "Snowball:  {} months, ${:.0} interest",
        comparison.snowball.months, comparison.snowball.interest
    )?;
    writeln!(
        out,
        "Avalanche: {} months, ${:.0} interest",
        comparison.avalanche.months, comparison.avalanche.interest
    )?;

    for warning in &response.warnings {
        writeln!(out)?;
        write!(
            out,
            "Warning: {}: {} Suggested minimum: ${:.0}/mo",
            warning.debt_name, warning.message, warning.required_min
        )?;
    }
    Ok(out.trim_end().to_string())
}
