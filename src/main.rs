// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use seq_model::config::AppConfig;
use seq_model::types::ModelEnum;
use seq_model::{FileManager, Project, TickGate, TrackMode, TRACK_COUNT};

const DEFAULT_CONFIG: &str = "seq-model.yaml";

fn print_usage() {
    println!("seq-model - sequencer project tool");
    println!();
    println!("Usage: seq-model [--config <FILE>] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --new <SLOT>                  Create an empty project in SLOT");
    println!("  --info <SLOT>                 Show the project stored in SLOT");
    println!("  --mode <SLOT> <TRACK> <MODE>  Change the type of TRACK (1-{})", TRACK_COUNT);
    println!("  --routes <SLOT>               List the active routes of a project");
    println!("  --help                        Show this help message");
    println!();
    print!("Track modes:");
    for mode in TrackMode::ALL {
        print!(" {}", mode);
    }
    println!();
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(&path)?,
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if default.exists() {
                AppConfig::load(&default)?
            } else {
                AppConfig::default()
            }
        }
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn parse_slot(arg: Option<&String>, config: &AppConfig) -> Result<usize> {
    match arg {
        Some(text) => text
            .parse()
            .map_err(|_| anyhow!("Invalid slot number: {}", text)),
        None => Ok(config.storage.default_slot),
    }
}

fn parse_track(arg: Option<&String>) -> Result<usize> {
    let text = arg.ok_or_else(|| anyhow!("--mode requires a track number"))?;
    let track: usize = text
        .parse()
        .map_err(|_| anyhow!("Invalid track number: {}", text))?;
    if !(1..=TRACK_COUNT).contains(&track) {
        return Err(anyhow!("Track must be between 1 and {}", TRACK_COUNT));
    }
    Ok(track - 1)
}

fn parse_mode(arg: Option<&String>) -> Result<TrackMode> {
    let text = arg.ok_or_else(|| anyhow!("--mode requires a track mode"))?;
    TrackMode::ALL
        .iter()
        .copied()
        .find(|mode| mode.name().eq_ignore_ascii_case(text))
        .ok_or_else(|| anyhow!("Unknown track mode: {}", text))
}

fn mounted_file_manager(config: &AppConfig) -> Result<FileManager> {
    let manager = FileManager::new(&config.storage.root);
    if !manager.volume_mounted() {
        return Err(anyhow!("No volume at {:?}", config.storage.root));
    }
    Ok(manager)
}

fn read_project(manager: &mut FileManager, slot: usize) -> Result<Project> {
    let mut project = Project::new();
    manager
        .read_project(&mut project, slot)
        .with_context(|| format!("Failed to read project slot {}", slot))?;
    Ok(project)
}

fn new_project(config: &AppConfig, slot: usize) -> Result<()> {
    let root = &config.storage.root;
    std::fs::create_dir_all(root).with_context(|| format!("Failed to create volume {:?}", root))?;
    let mut manager = FileManager::new(root);
    let project = config.project.new_project()?;
    manager
        .write_project(&project, slot)
        .with_context(|| format!("Failed to write project slot {}", slot))?;
    println!("Created project {} in slot {}", project.name(), slot);
    Ok(())
}

fn show_info(config: &AppConfig, slot: usize) -> Result<()> {
    let mut manager = mounted_file_manager(config)?;
    let project = read_project(&mut manager, slot)?;

    let mut line = String::new();
    write!(line, "Project {} (slot {})", project.name(), slot)?;
    println!("{}", line);

    line.clear();
    line.push_str("  Tempo  ");
    project.print_tempo(&mut line)?;
    line.push_str("  Swing ");
    project.print_swing(&mut line)?;
    println!("{}", line);

    line.clear();
    line.push_str("  Scale  ");
    project.print_scale(&mut line)?;
    line.push_str("  Root ");
    project.print_root_note(&mut line)?;
    println!("{}", line);

    println!();
    for track in project.tracks() {
        line.clear();
        write!(line, "  Track{} ", track.track_index() + 1)?;
        track.print_track_mode(&mut line)?;
        line.push_str("  link ");
        track.print_link_track(&mut line)?;
        println!("{}", line);
    }
    Ok(())
}

fn change_mode(config: &AppConfig, slot: usize, track: usize, mode: TrackMode) -> Result<()> {
    let mut manager = mounted_file_manager(config)?;
    let mut project = read_project(&mut manager, slot)?;
    let gate = TickGate::new();
    project.set_track_mode(&gate, track, mode);
    manager
        .write_project(&project, slot)
        .with_context(|| format!("Failed to write project slot {}", slot))?;
    println!("Track{} is now {}", track + 1, mode);
    Ok(())
}

fn list_routes(config: &AppConfig, slot: usize) -> Result<()> {
    let mut manager = mounted_file_manager(config)?;
    let project = read_project(&mut manager, slot)?;
    let mut count = 0;
    for (index, route) in project.routing().active_routes() {
        let tracks: Vec<String> = (0..TRACK_COUNT)
            .filter(|t| route.tracks() & (1 << t) != 0)
            .map(|t| (t + 1).to_string())
            .collect();
        println!(
            "  Route{:<2} {:<14} {:<8} [{:.2} .. {:.2}] tracks {}",
            index + 1,
            route.target(),
            route.source(),
            route.min(),
            route.max(),
            if tracks.is_empty() { "-".to_string() } else { tracks.join(",") }
        );
        count += 1;
    }
    if count == 0 {
        println!("No active routes");
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path = None;
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            eprintln!("Error: --config requires a file name");
            std::process::exit(1);
        }
        config_path = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }

    if args.is_empty() {
        println!("seq-model - sequencer project tool");
        println!("Run with --help for usage information");
        return Ok(());
    }

    if matches!(args[0].as_str(), "--help" | "-h") {
        print_usage();
        return Ok(());
    }

    let config = load_config(config_path)?;
    init_logging(&config);

    match args[0].as_str() {
        "--new" => {
            let slot = parse_slot(args.get(1), &config)?;
            new_project(&config, slot)?;
        }
        "--info" => {
            let slot = parse_slot(args.get(1), &config)?;
            show_info(&config, slot)?;
        }
        "--mode" => {
            if args.len() < 4 {
                eprintln!("Error: --mode requires a slot, a track and a mode");
                std::process::exit(1);
            }
            let slot = parse_slot(args.get(1), &config)?;
            let track = parse_track(args.get(2))?;
            let mode = parse_mode(args.get(3))?;
            change_mode(&config, slot, track, mode)?;
        }
        "--routes" => {
            let slot = parse_slot(args.get(1), &config)?;
            list_routes(&config, slot)?;
        }
        _ => {
            eprintln!("Unknown option: {}", args[0]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
