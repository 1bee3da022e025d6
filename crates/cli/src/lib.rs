pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::{compare::CompareArgs, estimate::EstimateArgs};

#[derive(Debug, Parser)]
#[command(
    name = "freightprint",
    about = "Freightprint operator CLI",
    long_about = "Operate Freightprint readiness, config inspection, smoke validation, and \
                  one-off emissions estimates and comparisons.",
    after_help = "Examples:\n  freightprint doctor --json\n  freightprint config\n  freightprint smoke\n  freightprint compare --weight 1000 --distance 500 --method air --method train"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with secrets redacted"
    )]
    Config,
    #[command(about = "Validate config, estimator key readiness, and supplier data checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run offline end-to-end engine checks with per-check timing details")]
    Smoke,
    #[command(about = "Estimate emissions for a single shipment leg via the live API")]
    Estimate {
        #[arg(long, help = "Shipment weight value")]
        weight: f64,
        #[arg(long, default_value = "kg", help = "Weight unit (g, kg, lb, mt)")]
        weight_unit: String,
        #[arg(long, help = "Shipment distance value")]
        distance: f64,
        #[arg(long, default_value = "km", help = "Distance unit (km, mi, m)")]
        distance_unit: String,
        #[arg(long, help = "Transport method (ship, train, truck, plane)")]
        method: String,
    },
    #[command(about = "Compare transport methods by emissions, with route resolution")]
    Compare {
        #[arg(long, help = "Shipment weight value")]
        weight: f64,
        #[arg(long, default_value = "kg", help = "Weight unit (g, kg, lb, mt)")]
        weight_unit: String,
        #[arg(long, help = "Shipment distance value (omit to resolve from origin/destination)")]
        distance: Option<f64>,
        #[arg(long, default_value = "km", help = "Distance unit (km, mi, m)")]
        distance_unit: String,
        #[arg(long = "method", required = true, help = "Transport method; repeat per method")]
        methods: Vec<String>,
        #[arg(long, help = "Origin place name")]
        origin: Option<String>,
        #[arg(long, help = "Destination place name")]
        destination: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Smoke => commands::smoke::run(),
        Command::Estimate { weight, weight_unit, distance, distance_unit, method } => {
            commands::estimate::run(EstimateArgs {
                weight_value: weight,
                weight_unit,
                distance_value: distance,
                distance_unit,
                transport_method: method,
            })
        }
        Command::Compare {
            weight,
            weight_unit,
            distance,
            distance_unit,
            methods,
            origin,
            destination,
        } => commands::compare::run(CompareArgs {
            weight_value: weight,
            weight_unit,
            distance_value: distance,
            distance_unit,
            transport_methods: methods,
            origin,
            destination,
        }),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
