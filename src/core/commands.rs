// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use super::models::{ProposedChange, Rule, SplitEvent};
use super::resolve::{resolve_and_apply_changes, split_shared_addresses};
use super::rules;
use super::tables::{load_data, write_outputs, write_proposals};
use super::view::MergedView;
use crate::app_config::AppConfig;

/// Runs every enabled rule over the view, in rule order, and prints a sample
/// of each rule's proposals.
pub fn collect_proposals(view: &MergedView, config: &AppConfig) -> Result<Vec<ProposedChange>> {
    let enabled = config.rules.enabled_rules()?;

    // Hidden automatically when stderr isn't a terminal
    let bar = ProgressBar::new(enabled.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .progress_chars("=> "),
    );

    let mut per_rule: Vec<(Rule, Vec<ProposedChange>)> = Vec::new();
    for rule in enabled {
        bar.set_message(rule.label());
        let proposals = rules::propose(rule, view, &config.rules)?;
        info!("{} produced {} proposals", rule, proposals.len());
        per_rule.push((rule, proposals));
        bar.inc(1);
    }
    bar.finish_and_clear();

    let mut all = Vec::new();
    for (rule, proposals) in per_rule {
        show_samples(rule, &proposals, config.report.samples);
        all.extend(proposals);
    }
    Ok(all)
}

fn show_samples(rule: Rule, proposals: &[ProposedChange], k: usize) {
    println!("    {}: {} proposals generated", rule.label(), proposals.len());
    for p in proposals.iter().take(k) {
        println!(
            "       • AID {} {}: {:?} -> {:?}",
            p.original_aid,
            p.column,
            p.original_value.as_deref().unwrap_or(""),
            p.proposed_value
        );
    }
    if proposals.len() > k {
        println!("       … (+{} more)", proposals.len() - k);
    }
}

fn show_splits(splits: &[SplitEvent], k: usize) {
    if splits.is_empty() {
        println!("No AID splits were necessary during conflict resolution.");
        return;
    }
    println!("Total splits created: {}", splits.len());
    println!("    (showing first {}):", k.min(splits.len()));
    for ev in splits.iter().take(k) {
        println!(
            "     • AID {} → new AID {} (column {}, value='{}')",
            ev.old_aid, ev.new_aid, ev.column, ev.new_value
        );
    }
}

fn show_shared_splits(minted: &[(i64, i64)], k: usize) {
    println!(
        "Split pass: {} new AIDs minted due to conflicting signatures",
        minted.len()
    );
    for (old_aid, new_aid) in minted.iter().take(k) {
        println!("     • AID {} → new AID {}", old_aid, new_aid);
    }
    if minted.len() > k {
        println!("       … (+{} more)", minted.len() - k);
    }
}

/// Load, propose, resolve, optionally split shared addresses, and write the
/// cleaned tables.
pub fn run_pipeline(config: &AppConfig) -> Result<()> {
    let (mut addresses, entities, mut relationships) = load_data(&config.data.input_path())?;
    let max_aid = addresses.max_aid();

    println!("Building merged view …");
    let view = MergedView::build(&addresses, &entities, &relationships);

    let proposals = collect_proposals(&view, config)?;
    println!("Collected {} total proposals → resolving …", proposals.len());

    let resolution =
        resolve_and_apply_changes(&mut addresses, &mut relationships, &proposals, max_aid)?;
    show_splits(&resolution.splits, config.report.samples);

    if config.report.split_shared_addresses {
        let minted =
            split_shared_addresses(&mut addresses, &mut relationships, resolution.max_aid);
        show_shared_splits(&minted, config.report.samples);
    }

    let output_dir = config.data.output_path();
    write_outputs(&output_dir, &addresses, &relationships)?;
    println!("Cleaned data written to {}", output_dir.display());
    Ok(())
}

/// Dry run: print proposals and optionally export them, without touching any
/// table.
pub fn propose(config: &AppConfig, output: Option<&Path>) -> Result<()> {
    let (addresses, entities, relationships) = load_data(&config.data.input_path())?;
    let view = MergedView::build(&addresses, &entities, &relationships);

    let proposals = collect_proposals(&view, config)?;
    println!("Collected {} total proposals", proposals.len());

    if let Some(output) = output {
        write_proposals(output, &proposals)?;
        println!("Proposals written to {}", output.display());
    }
    Ok(())
}

/// Only the shared-address split pass, then write the tables.
pub fn split(config: &AppConfig) -> Result<()> {
    let (mut addresses, _entities, mut relationships) = load_data(&config.data.input_path())?;

    let max_aid = addresses.max_aid();
    let minted = split_shared_addresses(&mut addresses, &mut relationships, max_aid);
    show_shared_splits(&minted, config.report.samples);

    let output_dir = config.data.output_path();
    write_outputs(&output_dir, &addresses, &relationships)?;
    println!("Cleaned data written to {}", output_dir.display());
    Ok(())
}

/// Show the configuration file. Invalid values are printed as-is, followed by
/// a warning on stderr.
pub fn print_config(settings: config::Config) -> Result<()> {
    let app_config: AppConfig = settings.try_into()?;
    println!("{}", toml::to_string(&app_config)?);

    if let Err(e) = app_config.validate() {
        eprintln!("Warning: {}", e);
    }
    Ok(())
}
