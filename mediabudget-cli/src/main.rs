//! Media budget CLI — calculate budgets from scenario files.
//!
//! Commands:
//! - `calculate` — recalculate a scenario's snapshot and print the result
//! - `check-fees` — validate a scenario's fee configuration without calculating
//! - `solve` — find the media budget for a given client total

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mediabudget_core::domain::{BudgetMode, BudgetSnapshot, FEE_SLOT_COUNT};
use mediabudget_core::engine::{calculate, validate_fees, Advisory, CalculationReport, FeeOutcome};
use mediabudget_core::options::Verbosity;
use mediabudget_session::{context, FeeConfigProvider, Scenario, StoredSnapshot};

#[derive(Parser)]
#[command(name = "mediabudget", about = "Media budget calculator — fee cascade and client-total solver")]
struct Cli {
    /// More engine detail: -v debug, -vv trace (records solver steps).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recalculate the snapshot in a scenario file.
    Calculate {
        /// Scenario file (.toml or .json).
        #[arg(long)]
        scenario: PathBuf,

        /// Print the snapshot and report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write the recalculated snapshot as a versioned envelope.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Validate the fee configuration of a scenario file.
    CheckFees {
        /// Scenario file (.toml or .json).
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Solve for the media budget that yields a client total.
    Solve {
        /// Scenario file (.toml or .json).
        #[arg(long)]
        scenario: PathBuf,

        /// Target client total, e.g. 125000.00.
        #[arg(long)]
        client_total: String,

        /// Print the snapshot and report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Calculate { scenario, json, save } => run_calculate(&scenario, cli.verbose, json, save.as_deref()),
        Commands::CheckFees { scenario } => run_check_fees(&scenario),
        Commands::Solve { scenario, client_total, json } => run_solve(&scenario, &client_total, cli.verbose, json),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_scenario(path: &Path, verbose: u8) -> Result<Scenario> {
    let mut scenario =
        Scenario::from_path(path).with_context(|| format!("loading scenario {}", path.display()))?;
    scenario.options.verbosity = match verbose {
        0 => scenario.options.verbosity,
        1 => scenario.options.verbosity.max(Verbosity::Debug),
        _ => Verbosity::Trace,
    };
    debug!(
        path = %path.display(),
        fees = scenario.fees.len(),
        verbosity = ?scenario.options.verbosity,
        "scenario loaded"
    );
    Ok(scenario)
}

fn run_calculate(path: &Path, verbose: u8, json: bool, save: Option<&Path>) -> Result<()> {
    let scenario = load_scenario(path, verbose)?;
    let (snapshot, report) = calculate(&scenario.snapshot, &context(&scenario, &scenario), &scenario.options);
    emit(&snapshot, &report, json)?;

    if !report.success {
        std::process::exit(1);
    }
    if let Some(out) = save {
        StoredSnapshot::new(snapshot).save(out)?;
        if !json {
            println!("Snapshot saved to: {}", out.display());
        }
    }
    Ok(())
}

fn run_check_fees(path: &Path) -> Result<()> {
    let scenario = load_scenario(path, 0)?;
    if let Err(err) = validate_fees(scenario.fees()) {
        eprintln!("Invalid fee configuration: {err}");
        std::process::exit(1);
    }

    let mut fees: Vec<_> = scenario.fees().iter().collect();
    fees.sort_by_key(|f| f.order);
    println!("{} fee(s) OK", fees.len());
    for (slot, fee) in fees.iter().enumerate() {
        let options: Vec<&str> = fee.options.iter().map(|o| o.id.0.as_str()).collect();
        println!(
            "  slot {}: {} (order {}, {:?}, {:?}) options: {}",
            slot + 1,
            fee.id,
            fee.order,
            fee.calculation_type,
            fee.calculation_mode,
            options.join(", ")
        );
    }
    Ok(())
}

fn run_solve(path: &Path, client_total: &str, verbose: u8, json: bool) -> Result<()> {
    let target = Decimal::from_str(client_total.trim())
        .with_context(|| format!("invalid client total '{client_total}'"))?;
    if target.is_sign_negative() {
        bail!("client total must not be negative, got {target}");
    }

    let mut scenario = load_scenario(path, verbose)?;
    scenario.snapshot.budget_mode = BudgetMode::ClientTotal;
    scenario.snapshot.budget_input = target;

    let (snapshot, report) = calculate(&scenario.snapshot, &context(&scenario, &scenario), &scenario.options);
    emit(&snapshot, &report, json)?;

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

fn emit(snapshot: &BudgetSnapshot, report: &CalculationReport, json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({ "snapshot": snapshot, "report": report });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(snapshot, report);
    }
    Ok(())
}

fn print_summary(snapshot: &BudgetSnapshot, report: &CalculationReport) {
    if let Some(err) = &report.error {
        eprintln!("Calculation failed: {err}");
        return;
    }

    let currency = &snapshot.buy_currency;
    println!("Mode:          {:?}", snapshot.budget_mode);
    println!("Media budget:  {} {currency}", snapshot.media_budget);
    for slot in 0..FEE_SLOT_COUNT {
        match report.fees[slot] {
            FeeOutcome::Disabled => {}
            FeeOutcome::Pending { reason } => println!("  fee {}: pending ({reason:?})", slot + 1),
            FeeOutcome::Computed { value } => println!("  fee {}: {value} {currency}", slot + 1),
        }
    }
    println!("Fees total:    {} {currency}", snapshot.fees_total());
    println!("Client budget: {} {currency}", snapshot.client_budget);
    if !snapshot.unit_price.is_zero() {
        println!("Unit volume:   {}", snapshot.unit_volume);
    }
    if snapshot.bonus_active {
        println!("Bonus value:   {} {currency}", snapshot.bonus_value);
    }
    if let Some(reference) = &snapshot.reference_totals {
        println!(
            "Reference:     media {} / fees {} / client {} {} (rate {})",
            reference.media_budget,
            reference.fees_total,
            reference.client_budget,
            snapshot.reference_currency,
            snapshot.currency_rate
        );
    }
    if let Some(convergence) = &report.convergence {
        if snapshot.budget_mode == BudgetMode::ClientTotal {
            println!(
                "Solver:        {} after {} iteration(s), gap {}",
                if convergence.has_converged { "converged" } else { "NOT converged" },
                convergence.iterations,
                convergence.final_difference
            );
        }
    }
    let pending = report.pending_slots();
    if !pending.is_empty() {
        let slots: Vec<String> = pending.iter().map(|slot| (slot + 1).to_string()).collect();
        println!("Pending fees:  {}", slots.join(", "));
    }
    if report.has_warnings() {
        println!();
        for advisory in &report.advisories {
            println!("warning: {}", describe(advisory));
        }
    }
}

fn describe(advisory: &Advisory) -> String {
    match advisory {
        Advisory::MissingCurrencyRate { currency } => format!("no exchange rate for {currency}, amounts not converted"),
        Advisory::UnknownUnitType { unit_type } => format!("unknown unit type '{unit_type}', priced per unit"),
        Advisory::VolumeUndetermined => "unit price is zero, volume undetermined".to_string(),
        Advisory::BonusPending => "bonus active but no negotiated value entered".to_string(),
        Advisory::NegotiatedBelowMedia { negotiated, media } => {
            format!("negotiated value {negotiated} is below media budget {media}, no bonus")
        }
        Advisory::OverrideIgnored { slot_number, fee_id } => {
            format!("override on fee slot {slot_number} ({fee_id}) ignored, option not editable")
        }
        Advisory::NotConverged { final_difference } => {
            format!("client total not reached, off by {final_difference}")
        }
        Advisory::TargetBelowFixedFees { target, minimum_client_budget } => {
            format!("client total {target} is below the fixed fees, minimum is {minimum_client_budget}")
        }
    }
}
