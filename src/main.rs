// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Metascene CLI entrypoint.
//!
//! Offline tooling over saved scenes: validate them against a meta model, re-evaluate their
//! visuals headlessly, or duplicate them with fresh ids.

use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use log::{debug, error, info, warn, LevelFilter};

use metascene::config::load_config;
use metascene::editor::{Collaborators, Editor};
use metascene::host::recording::{RecordingBus, RecordingRenderer, RecordingSimulation};
use metascene::ops::copy_scene;
use metascene::query::validate_scene;
use metascene::store::{load_meta_model, load_scene, save_scene, StoreError, WriteDurability};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the editor configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Flush and sync written files before returning
    #[arg(long, global = true)]
    durable_writes: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report structural problems of a scene
    Check {
        #[arg(short, long)]
        meta: PathBuf,
        scene: PathBuf,
    },
    /// Re-evaluate every visual and run the hybrid algorithms
    Refresh {
        #[arg(short, long)]
        meta: PathBuf,
        scene: PathBuf,
        /// Defaults to overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Duplicate a scene under fresh ids
    Copy {
        scene: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} issue(s) found")]
    Issues(usize),
    #[error("scene {} could not be reopened after refresh", .0.display())]
    Lost(PathBuf),
}

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", args.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
    debug!(args:?; "parsed arguments");

    if let Err(err) = run(&args) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let durability = if args.durable_writes {
        WriteDurability::Durable
    } else {
        WriteDurability::BestEffort
    };
    match &args.command {
        Command::Check { meta, scene } => check(meta, scene),
        Command::Refresh {
            meta,
            scene,
            output,
        } => refresh(
            args.config.as_deref(),
            meta,
            scene,
            output.as_deref().unwrap_or(scene.as_path()),
            durability,
        ),
        Command::Copy {
            scene,
            output,
            name,
        } => {
            let source = load_scene(scene)?;
            let name = name
                .clone()
                .unwrap_or_else(|| format!("{} (copy)", source.name));
            let (copy, remap) = copy_scene(&source, name);
            save_scene(output, &copy, durability)?;
            info!(output:? = output, ids = remap.len(); "scene copied");
            Ok(())
        }
    }
}

fn check(meta: &Path, scene: &Path) -> Result<(), CliError> {
    let meta = load_meta_model(meta)?;
    let scene = load_scene(scene)?;
    let issues = validate_scene(&scene, &meta);
    for issue in &issues {
        println!("{issue}");
    }
    if issues.is_empty() {
        info!(scene:% = scene.uuid; "scene is consistent");
        Ok(())
    } else {
        Err(CliError::Issues(issues.len()))
    }
}

fn refresh(
    config: Option<&Path>,
    meta: &Path,
    scene: &Path,
    output: &Path,
    durability: WriteDurability,
) -> Result<(), CliError> {
    let config = load_config(config)?;
    let meta = Rc::new(load_meta_model(meta)?);
    let services = Collaborators::new(
        meta,
        Rc::new(RecordingRenderer::new()),
        Rc::new(RecordingBus::new()),
        Rc::new(RecordingSimulation::new()),
    );
    let mut editor = Editor::new(config, services);

    let (id, report) = editor.import_scene(load_scene(scene)?);
    for (instance, err) in &report.failed {
        warn!(instance:% = instance, error:% = err; "visual not refreshed");
    }
    let refreshed = editor
        .close_scene(&id)
        .ok_or_else(|| CliError::Lost(scene.to_path_buf()))?;
    save_scene(output, &refreshed, durability)?;
    info!(
        output:? = output,
        updated = report.updated,
        failed = report.failed.len();
        "scene refreshed"
    );
    Ok(())
}
