// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::path::Path;

use anyhow::Result;
use clap::{crate_authors, crate_description, crate_version};
use clap::{Arg, ArgMatches, Command};
use strum::VariantNames;

use crate::app_config::AppConfig;
use crate::core::commands;
use crate::core::models::Rule;

/// Match commands
pub fn cli_match(mut settings: config::Config, cli_matches: ArgMatches) -> Result<()> {
    if let Some(data_dir) = cli_matches.value_of("data_dir") {
        settings.set("data.input_dir", data_dir)?;
    }

    // Handle config subcommand first, because it doesn't need a valid configuration
    if let Some(("config", _config_matches)) = cli_matches.subcommand() {
        commands::print_config(settings)?;
        return Ok(());
    }

    match cli_matches.subcommand() {
        Some(("run", run_matches)) => {
            apply_rule_overrides(&mut settings, run_matches)?;
            apply_report_overrides(&mut settings, run_matches)?;
            apply_output_overrides(&mut settings, run_matches)?;
            apply_split_override(&mut settings, run_matches)?;
            commands::run_pipeline(&AppConfig::from_settings(settings)?)?;
        }
        Some(("propose", propose_matches)) => {
            apply_rule_overrides(&mut settings, propose_matches)?;
            apply_report_overrides(&mut settings, propose_matches)?;
            let output = propose_matches.value_of("output").map(Path::new);
            commands::propose(&AppConfig::from_settings(settings)?, output)?;
        }
        Some(("split", split_matches)) => {
            apply_report_overrides(&mut settings, split_matches)?;
            apply_output_overrides(&mut settings, split_matches)?;
            commands::split(&AppConfig::from_settings(settings)?)?;
        }
        _ => {
            // Arguments are required by default (in Clap).
            // This section should never execute.
            unreachable!("No matching subcommand!");
        }
    }
    Ok(())
}

/// Flags shared by `run` and `propose` win over config file and environment.
fn apply_rule_overrides(settings: &mut config::Config, matches: &ArgMatches) -> Result<()> {
    if let Some(rules) = matches.values_of("rules") {
        let rules: Vec<String> = rules.map(str::to_owned).collect();
        settings.set("rules.enabled", rules)?;
    }
    if matches.is_present("street_threshold") {
        let threshold: f64 = matches
            .value_of_t("street_threshold")
            .unwrap_or_else(|e| e.exit());
        settings.set("rules.street_threshold", threshold)?;
    }
    if matches.is_present("city_threshold") {
        let threshold: f64 = matches
            .value_of_t("city_threshold")
            .unwrap_or_else(|e| e.exit());
        settings.set("rules.city_threshold", threshold)?;
    }
    Ok(())
}

fn apply_report_overrides(settings: &mut config::Config, matches: &ArgMatches) -> Result<()> {
    if matches.is_present("samples") {
        let samples: usize = matches.value_of_t("samples").unwrap_or_else(|e| e.exit());
        settings.set("report.samples", samples as i64)?;
    }
    Ok(())
}

fn apply_output_overrides(settings: &mut config::Config, matches: &ArgMatches) -> Result<()> {
    if let Some(output_dir) = matches.value_of("output_dir") {
        settings.set("data.output_dir", output_dir)?;
    }
    Ok(())
}

fn apply_split_override(settings: &mut config::Config, matches: &ArgMatches) -> Result<()> {
    if matches.is_present("split_shared") {
        settings.set("report.split_shared_addresses", true)?;
    }
    Ok(())
}

fn rule_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("rules")
            .short('r')
            .long("rules")
            .value_name("RULE")
            .help("Only run these rules (comma-separated)")
            .takes_value(true)
            .multiple_occurrences(true)
            .use_value_delimiter(true)
            .possible_values(Rule::VARIANTS),
        Arg::new("street_threshold")
            .long("street-threshold")
            .value_name("RATIO")
            .help("Edit-distance ratio below which street spellings are merged")
            .takes_value(true),
        Arg::new("city_threshold")
            .long("city-threshold")
            .value_name("RATIO")
            .help("Edit-distance ratio below which city spellings are merged")
            .takes_value(true),
    ]
}

fn samples_arg() -> Arg<'static> {
    Arg::new("samples")
        .short('n')
        .long("samples")
        .value_name("N")
        .help("Number of samples to print per section")
        .takes_value(true)
}

fn output_dir_arg() -> Arg<'static> {
    Arg::new("output_dir")
        .short('o')
        .long("output-dir")
        .value_name("DIR")
        .help("Write cleaned tables to this directory")
        .takes_value(true)
}

/// Configure Clap
pub fn build_cli() -> Command<'static> {
    Command::new("addrfix")
        .arg_required_else_help(true)
        .version(crate_version!())
        .about(crate_description!())
        .author(crate_authors!("\n"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Set a custom config file")
                .takes_value(true),
        )
        .arg(
            Arg::new("data_dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Directory containing fa.csv, fe.csv, and r_fe_fa.csv")
                .takes_value(true),
        )
        .subcommand(
            Command::new("run")
                .about("Apply all enabled rules, resolve conflicts, and write cleaned tables")
                .args(rule_args())
                .arg(samples_arg())
                .arg(output_dir_arg())
                .arg(
                    Arg::new("split_shared")
                        .long("split-shared")
                        .help("Give each entity sharing an AID its own AID afterwards"),
                ),
        )
        .subcommand(
            Command::new("propose")
                .about("Print proposed changes without applying them")
                .args(rule_args())
                .arg(samples_arg())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Also export proposals (.json for JSON, otherwise CSV)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("split")
                .about("Only split AIDs shared by entities with different signatures")
                .arg(samples_arg())
                .arg(output_dir_arg()),
        )
        .subcommand(Command::new("config").about("Show Configuration"))
}

/// This function will configure clap and match arguments
pub fn cli_config() -> Result<ArgMatches> {
    let cli_matches = build_cli().get_matches();
    Ok(cli_matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_rule_overrides() {
        let matches = build_cli()
            .try_get_matches_from(vec![
                "addrfix",
                "propose",
                "--rules",
                "city-names,street-names",
                "--city-threshold",
                "0.3",
                "-n",
                "9",
            ])
            .unwrap();
        let (_, propose_matches) = matches.subcommand().unwrap();

        let mut settings = crate::app_config::default_settings().unwrap();
        apply_rule_overrides(&mut settings, propose_matches).unwrap();
        apply_report_overrides(&mut settings, propose_matches).unwrap();
        let config = AppConfig::from_settings(settings).unwrap();

        assert_eq!(
            config.rules.enabled_rules().unwrap(),
            vec![Rule::StreetNames, Rule::CityNames]
        );
        assert_eq!(config.rules.city_threshold, 0.3);
        assert_eq!(config.rules.street_threshold, 0.10);
        assert_eq!(config.report.samples, 9);
    }

    #[test]
    fn test_unknown_rule_rejected_by_parser() {
        let result = build_cli().try_get_matches_from(vec!["addrfix", "run", "--rules", "rule-9"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_flags() {
        let matches = build_cli()
            .try_get_matches_from(vec![
                "addrfix",
                "-d",
                "in",
                "run",
                "-o",
                "out",
                "--split-shared",
            ])
            .unwrap();
        assert_eq!(matches.value_of("data_dir"), Some("in"));
        let (name, run_matches) = matches.subcommand().unwrap();
        assert_eq!(name, "run");

        let mut settings = crate::app_config::default_settings().unwrap();
        apply_output_overrides(&mut settings, run_matches).unwrap();
        apply_split_override(&mut settings, run_matches).unwrap();
        let config = AppConfig::from_settings(settings).unwrap();
        assert_eq!(config.data.output_dir, "out");
        assert!(config.report.split_shared_addresses);
    }
}
