// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyvis CLI

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use polyvis::config::AnalysisConfig;
use polyvis::geometry::{topology, BooleanConfig, MeshBooleanEngine};
use polyvis::io;
use polyvis::{PolygonReport, RunSummary};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyvis")]
#[command(version, about = "Visibility equivalence over convex viewpoint polygons", long_about = None)]
struct Cli {
    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a polygon: per-edge equivalence and the polygon volume
    Evaluate {
        /// Configuration file (defaults to polyvis.toml and POLYVIS_* variables)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the subdivision depth bound
        #[arg(long)]
        max_depth: Option<u32>,

        /// Override the environment mesh
        #[arg(long)]
        world: Option<PathBuf>,

        /// Write every output under this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the topology of a mesh
    Classify {
        /// Input OBJ file
        mesh: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Intersect two closed meshes
    Intersect {
        a: PathBuf,
        b: PathBuf,

        /// Output OBJ file
        #[arg(short, long)]
        output: PathBuf,

        /// Vertex weld tolerance
        #[arg(short, long, default_value = "0.000001")]
        tolerance: f64,

        /// Accept results made of several shells
        #[arg(long)]
        allow_disconnected: bool,
    },

    /// Write a default configuration file
    InitConfig {
        #[arg(default_value = "polyvis.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            config,
            max_depth,
            world,
            output,
        } => evaluate_command(config.as_deref(), max_depth, world, output),
        Commands::Classify { mesh, json } => classify_command(&mesh, json),
        Commands::Intersect {
            a,
            b,
            output,
            tolerance,
            allow_disconnected,
        } => intersect_command(&a, &b, &output, tolerance, allow_disconnected),
        Commands::InitConfig { path, force } => init_config_command(&path, force),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed_precise}]")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn evaluate_command(
    config_path: Option<&Path>,
    max_depth: Option<u32>,
    world: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::load()?,
    };
    if let Some(depth) = max_depth {
        config.max_depth = depth;
    }
    if let Some(world) = world {
        config.renderer.world_mesh = world;
    }
    if let Some(dir) = output {
        config.set_output_dir(dir);
    }
    if !config.renderer.world_mesh.exists() {
        bail!("World mesh not found: {}", config.renderer.world_mesh.display());
    }

    let driver = config.driver()?;
    println!(
        "{} {} vertices, max depth {}, renderer {}",
        "Evaluating polygon:".bold(),
        driver.polygon().len(),
        config.max_depth,
        config.renderer.binary.display()
    );

    let pb = spinner("computing visibility volumes")?;
    let report = driver.evaluate();
    pb.finish_and_clear();

    let written = io::export_segment_volumes(&report, &config.output.segment_dir)
        .context("Failed to export segment volumes")?;
    let polygon_written = io::export_polygon_volume(&report, &config.output.polygon_file)
        .context("Failed to export polygon volume")?;

    let summary = report.summary();
    if let Some(path) = &config.output.report_file {
        io::write_summary(&summary, path).with_context(|| format!("Failed to write report: {path:?}"))?;
    }

    print_report(&report, &summary);
    println!(
        "\n{} {} segment volumes in {}",
        "Wrote".green(),
        written.len(),
        config.output.segment_dir.display()
    );
    if polygon_written {
        println!("{} {}", "Wrote".green(), config.output.polygon_file.display());
    } else {
        println!("{}", "No polygon volume was produced".red());
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &PolygonReport, summary: &RunSummary) {
    println!("\n{}", "━".repeat(80).bright_black());
    for edge in &summary.edges {
        let status = if !edge.failures.is_empty() {
            "FAILED".red().bold()
        } else if edge.equivalent {
            "equivalent".green().bold()
        } else {
            "not equivalent".yellow().bold()
        };
        println!(
            "{} {:<8} {} ({} segments)",
            "Edge".bold(),
            edge.edge.to_string().cyan(),
            status,
            edge.segments.len()
        );
        for segment in &edge.segments {
            println!(
                "    [{:.4}, {:.4}] depth {} χ={} {}",
                segment.span[0],
                segment.span[1],
                segment.depth,
                segment.euler_characteristic,
                if segment.equivalent { "✓".green() } else { "✗".yellow() }
            );
        }
        for failure in &edge.failures {
            println!(
                "    [{:.4}, {:.4}] depth {} {}: {}",
                failure.span[0],
                failure.span[1],
                failure.depth,
                failure.kind.red(),
                failure.message
            );
        }
    }
    println!("{}", "━".repeat(80).bright_black());
    println!(
        "{} {}  {} {}  {} {}  {} {:.2?}",
        "Leaves:".bold(),
        report.leaf_count(),
        "Failures:".bold(),
        report.failure_count(),
        "Renderer calls:".bold(),
        report.invocations,
        "Time:".bold(),
        report.elapsed
    );
}

fn classify_command(path: &Path, json: bool) -> Result<()> {
    let mesh = io::read_obj(path)?;
    let report = topology::classify(&mesh);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
        if report.is_simply_connected() {
            println!("{}", "Simply connected (genus 0)".green().bold());
        } else {
            println!("{}", "Not simply connected".yellow().bold());
        }
    }
    Ok(())
}

fn intersect_command(a: &Path, b: &Path, output: &Path, tolerance: f64, allow_disconnected: bool) -> Result<()> {
    let mesh_a = io::read_obj(a)?;
    let mesh_b = io::read_obj(b)?;
    let engine = MeshBooleanEngine::new(BooleanConfig {
        weld_tolerance: tolerance,
        require_single_component: !allow_disconnected,
        ..BooleanConfig::default()
    });

    let start = Instant::now();
    let result = engine
        .intersect_with_stats(&mesh_a, &mesh_b)
        .with_context(|| format!("Failed to intersect {} and {}", a.display(), b.display()))?;
    let elapsed = start.elapsed();

    io::write_obj(&result.mesh, output)?;

    let stats = &result.stats;
    println!("{} {:.2?}", "Intersected in".bold(), elapsed);
    println!(
        "  candidate pairs {}, crossing {}, coplanar {}, split faces {}, kept faces {}",
        stats.candidate_pairs, stats.crossing_pairs, stats.coplanar_pairs, stats.split_faces, stats.kept_faces
    );
    topology::classify(&result.mesh).print();
    println!("{} {}", "Wrote".green(), output.display());
    Ok(())
}

fn init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AnalysisConfig::default().save(path)?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}
