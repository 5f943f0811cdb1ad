use std::path::PathBuf;

use anyhow::{Context, Result};
use clashguard_check::{ignore_covers_root, resolve_owner, CollisionCheck, NoopObserver, Verdict};
use clashguard_core::IgnoreSet;
use clashguard_installed::InstalledIndex;
use serde_json::json;

use crate::config::{CheckConfig, CONFIG_ENV};
use crate::discovery::discover_gcc_info_dir;
use crate::hook_env::{
    build_ignore_set, build_request, collision_ignore, target_root, InstallVars, ProcessVars,
    RequestOverrides,
};
use crate::render::{
    current_output_style, format_verdict_lines, TerminalObserver, TerminalRenderer,
};
use crate::{Cli, Commands, OutputFormat};

pub(crate) fn run_cli(cli: Cli) -> Result<i32> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let config = CheckConfig::load(config_path.as_deref())?;
    let overrides = RequestOverrides {
        root: cli.root.clone(),
        image: cli.image.clone(),
        destination_repo: cli.destination_repo.clone(),
    };
    let renderer = TerminalRenderer::from_style(current_output_style());
    let vars = ProcessVars;

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => {
            let verdict = run_check(&vars, &overrides, &config, cli.format, renderer)
                .unwrap_or_else(|err| Verdict::failed(format!("{err:#}")));
            match cli.format {
                OutputFormat::Plain => {
                    renderer.print_lines(&format_verdict_lines(&verdict, renderer.style()))
                }
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&verdict).context("failed to encode verdict")?
                ),
            }
            Ok(verdict.exit_status)
        }
        Commands::Owner { path } => {
            let root = target_root(&vars, &overrides);
            let index = InstalledIndex::load(&config.repositories_for(&root))?;
            let owner = resolve_owner(&path, &index);
            match cli.format {
                OutputFormat::Plain => match &owner {
                    Some(owner) => println!("{owner}"),
                    None => println!("orphaned"),
                },
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "path": path, "owner": owner, "orphaned": owner.is_none() })
                ),
            }
            Ok(if owner.is_some() { 0 } else { 1 })
        }
        Commands::Policy => {
            let ignore = resolve_ignore_set(&vars, &collision_ignore(&vars), &config);
            match cli.format {
                OutputFormat::Plain => renderer.print_lines(ignore.prefixes()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&ignore).context("failed to encode ignore set")?
                ),
            }
            Ok(0)
        }
    }
}

pub(crate) fn run_check(
    vars: &dyn InstallVars,
    overrides: &RequestOverrides,
    config: &CheckConfig,
    format: OutputFormat,
    renderer: TerminalRenderer,
) -> Result<Verdict> {
    let root = target_root(vars, overrides);
    let root_text = root.to_string_lossy();
    let collision_ignore = collision_ignore(vars);
    if ignore_covers_root(&collision_ignore, &root_text) {
        tracing::info!(target: "clashguard.cli", root = %root_text, "whole root ignored");
        return Ok(Verdict::skipped(&root_text));
    }

    let request = build_request(vars, overrides)?;
    let ignore = resolve_ignore_set(vars, &collision_ignore, config);
    let repositories = config.repositories_for(&request.root);
    let index = InstalledIndex::load(&repositories)?;
    tracing::debug!(
        target: "clashguard.cli",
        package = %request.installing(),
        ignore = ignore.len(),
        installed = index.package_count(),
        "starting collision check"
    );

    let check = CollisionCheck::new(&request, &ignore, &index)
        .with_progress_interval(config.progress_interval);
    let verdict = match format {
        OutputFormat::Plain => {
            let mut observer = TerminalObserver::new(renderer);
            let verdict = check.run(&mut observer)?;
            tracing::debug!(
                target: "clashguard.cli",
                phase = ?observer.current_phase(),
                status = verdict.exit_status,
                "collision check finished"
            );
            verdict
        }
        OutputFormat::Json => check.run(&mut NoopObserver)?,
    };
    Ok(verdict)
}

fn resolve_ignore_set(
    vars: &dyn InstallVars,
    collision_ignore: &str,
    config: &CheckConfig,
) -> IgnoreSet {
    let info_dir = if config.discover_info_dir {
        discover_gcc_info_dir()
    } else {
        None
    };
    build_ignore_set(vars, collision_ignore, config, info_dir.as_deref())
}
