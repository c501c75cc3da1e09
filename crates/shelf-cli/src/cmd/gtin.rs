//! `shelf gtin` — stateless GTIN checks; no project needed.

use crate::output::{OutputMode, pretty_kv, render};
use clap::{Args, Subcommand};
use serde::Serialize;
use shelf_core::gtin;

#[derive(Args, Debug)]
pub struct GtinArgs {
    #[command(subcommand)]
    pub command: GtinCommand,
}

#[derive(Subcommand, Debug)]
pub enum GtinCommand {
    #[command(about = "Check length and GS1 check digit")]
    Validate(GtinCodeArgs),

    #[command(about = "Print the grouped display form")]
    Format(GtinCodeArgs),
}

#[derive(Args, Debug)]
pub struct GtinCodeArgs {
    /// Code to check; spaces and dashes are ignored.
    pub code: String,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    input: String,
    #[serde(flatten)]
    report: gtin::GtinReport,
}

#[derive(Debug, Serialize)]
struct FormatOutput {
    input: String,
    formatted: String,
}

/// Dispatch a `shelf gtin` subcommand.
///
/// An invalid code is reported, not treated as a command failure.
pub fn run_gtin(args: &GtinArgs, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        GtinCommand::Validate(code) => {
            let payload = ValidateOutput {
                input: code.code.clone(),
                report: gtin::report(&code.code),
            };
            render(output, &payload, |value, w| {
                let report = &value.report;
                if report.valid {
                    writeln!(w, "✓ valid")?;
                } else {
                    writeln!(w, "✗ invalid")?;
                }
                if let Some(kind) = report.kind {
                    pretty_kv(w, "Kind", kind.to_string())?;
                }
                if let Some(display) = &report.canonical_display {
                    pretty_kv(w, "Display", display)?;
                }
                if let (Some(code), Some(message)) = (&report.error_code, &report.error_message) {
                    pretty_kv(w, "Reason", format!("{message} ({code})"))?;
                }
                Ok(())
            })
        }
        GtinCommand::Format(code) => {
            let payload = FormatOutput {
                input: code.code.clone(),
                formatted: gtin::format(&code.code),
            };
            render(output, &payload, |value, w| writeln!(w, "{}", value.formatted))
        }
    }
}
