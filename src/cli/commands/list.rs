//! List command - Show the built-in fuzzers

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use contractfuzz::fuzzer::suite::{FuzzerDef, BUILTIN_FUZZERS};

#[derive(Debug, Serialize)]
struct FuzzerInfo {
    name: &'static str,
    target: &'static str,
    description: &'static str,
    security_check: Option<String>,
}

impl From<&FuzzerDef> for FuzzerInfo {
    fn from(def: &FuzzerDef) -> Self {
        Self {
            name: def.name,
            target: def.planner.target_kind(),
            description: def.description,
            security_check: def.security.map(|check| check.to_string()),
        }
    }
}

/// Run the list command
pub fn run(format: OutputFormat) -> Result<()> {
    let fuzzers: Vec<FuzzerInfo> = BUILTIN_FUZZERS.iter().map(FuzzerInfo::from).collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&fuzzers)?);
        }
        OutputFormat::Text | OutputFormat::Junit => {
            println!("{}", "Built-in fuzzers".cyan().bold());
            println!("{}", "=".repeat(50));
            for fuzzer in &fuzzers {
                println!(
                    "  {:<28} {:<10} {}",
                    fuzzer.name.yellow(),
                    fuzzer.target.dimmed(),
                    fuzzer.description
                );
            }
            println!();
            println!("{} fuzzers", fuzzers.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_from_definition() {
        let def = contractfuzz::fuzzer::suite::find("sql-injection").unwrap();
        let info = FuzzerInfo::from(def);
        assert_eq!(info.name, "sql-injection");
        assert_eq!(info.target, "fields");
        assert!(info.security_check.is_some());
    }

    #[test]
    fn lists_every_fuzzer() {
        assert!(run(OutputFormat::Json).is_ok());
    }
}
