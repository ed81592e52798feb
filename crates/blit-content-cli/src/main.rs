use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use blit_content_core::config::{MapCompileConfig, SpritePackConfig};
use blit_content_core::export::{lookup_to_json, read_lookup};
use blit_content_core::tmx::{MAP_INFO_FILE, compile_map_file, read_map_info_file};
use blit_content_core::{compile_sprite_pack, name_hash};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "blit-content",
    about = "Compile sprite packs and Tiled maps into RetroBlit binary content",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack the folders listed in a sprite pack descriptor into a sheet + lookup table
    Pack(PackArgs),
    /// Compile Tiled maps (.tmx) into binary map folders
    Map(MapArgs),
    /// Dump a sprite lookup table, or a compiled map folder, as JSON
    Inspect(InspectArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    /// Sprite pack descriptor (KEY=VALUE lines)
    #[arg(help_heading = "Input/Output")]
    descriptor: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Output base name (defaults to the descriptor's file stem)
    #[arg(short, long, help_heading = "Input/Output")]
    name: Option<String>,

    /// Override OUTPUT_WIDTH
    #[arg(long, help_heading = "Layout")]
    width: Option<u32>,
    /// Override OUTPUT_HEIGHT
    #[arg(long, help_heading = "Layout")]
    height: Option<u32>,
    /// Override TRIM
    #[arg(long, action = ArgAction::Set, help_heading = "Layout")]
    trim: Option<bool>,

    /// Worker threads (default: logical processor count)
    #[arg(long, help_heading = "Performance")]
    workers: Option<usize>,

    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the resolved configuration as JSON and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Dry run: pack and report but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct MapArgs {
    /// Map files to compile
    #[arg(required = true, help_heading = "Input/Output")]
    maps: Vec<PathBuf>,
    /// Output directory; each map compiles into <out_dir>/<map stem>/
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Close a segment file once it reaches this many bytes
    #[arg(long, default_value_t = 64 * 1024, help_heading = "Encoding")]
    max_segment_size: usize,
    /// zlib compression level (0..=9)
    #[arg(long, default_value_t = 6, help_heading = "Encoding")]
    compression_level: u32,
}

#[derive(Parser, Debug, Clone)]
struct InspectArgs {
    /// A `.sprites.bytes` lookup file, or a compiled map folder
    path: PathBuf,
    /// Sprite names to resolve against the lookup table's hashes
    #[arg(long)]
    names: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args),
        Commands::Map(args) => run_map(args, cli.progress && !cli.quiet),
        Commands::Inspect(args) => run_inspect(args),
    }
}

fn run_pack(cli: &PackArgs) -> anyhow::Result<()> {
    let mut cfg = SpritePackConfig::from_descriptor_file(&cli.descriptor)
        .with_context(|| format!("read descriptor {}", cli.descriptor.display()))?;
    if let Some(w) = cli.width {
        cfg.output_width = w;
    }
    if let Some(h) = cli.height {
        cfg.output_height = h;
    }
    if let Some(t) = cli.trim {
        cfg.trim = t;
    }
    if cli.workers.is_some() {
        cfg.workers = cli.workers;
    }
    cfg.validate()?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let name = match &cli.name {
        Some(n) => n.clone(),
        None => cli
            .descriptor
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sprites")
            .to_string(),
    };

    let start = Instant::now();
    let Some(out) = compile_sprite_pack(&cfg)? else {
        return Ok(());
    };
    info!(
        elapsed = %fmt_dur(start.elapsed()),
        wasted = out.stats.wasted_area(),
        "{}",
        out.stats.summary()
    );

    if !cli.dry_run {
        let written = out
            .write(&cli.out_dir, &name)
            .with_context(|| format!("write atlas to {}", cli.out_dir.display()))?;
        info!(image = ?written.image, lookup = ?written.lookup, "sprite pack written");
    }

    if let Some(stats_path) = &cli.export_stats {
        if !cli.dry_run {
            fs::write(stats_path, serde_json::to_string_pretty(&out.stats)?)
                .with_context(|| format!("write {}", stats_path.display()))?;
            info!(?stats_path, "stats exported");
        } else {
            println!("{}", out.stats.summary());
        }
    }
    Ok(())
}

fn run_map(args: &MapArgs, show_progress: bool) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let cfg = MapCompileConfig::builder()
        .max_segment_size(args.max_segment_size)
        .compression_level(args.compression_level)
        .build();
    cfg.validate()?;

    let bar = if show_progress && args.maps.len() > 1 {
        let b = ProgressBar::new(args.maps.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} compiling {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };

    let mut failed = 0usize;
    for tmx in &args.maps {
        let stem = tmx.file_stem().and_then(|s| s.to_str()).unwrap_or("map");
        if let Some(b) = &bar {
            b.set_message(stem.to_string());
        }
        let out_dir = args.out_dir.join(stem);
        let start = Instant::now();
        match compile_map_file(tmx, &out_dir, &cfg) {
            Ok(report) => info!(
                map = %tmx.display(),
                out = %out_dir.display(),
                files = report.files.len(),
                elapsed = %fmt_dur(start.elapsed()),
                "map written"
            ),
            Err(e) => {
                failed += 1;
                error!(map = %tmx.display(), error = %e, "map failed");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} maps failed to compile", args.maps.len());
    }
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> anyhow::Result<()> {
    if args.path.is_dir() {
        let info = read_map_info_file(&args.path.join(MAP_INFO_FILE))?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    let bytes = fs::read(&args.path).with_context(|| format!("read {}", args.path.display()))?;
    let entries = read_lookup(&mut Cursor::new(bytes))
        .with_context(|| format!("parse lookup table {}", args.path.display()))?;
    let mut value = lookup_to_json(&entries);
    if !args.names.is_empty() {
        let resolved: serde_json::Map<String, serde_json::Value> = args
            .names
            .iter()
            .map(|n| {
                let hash = name_hash(n);
                let found = entries.iter().any(|e| e.hash == hash);
                if !found {
                    warn!(name = %n, hash, "name not present in lookup table");
                }
                (n.clone(), serde_json::json!({"hash": hash, "present": found}))
            })
            .collect();
        value["names"] = serde_json::Value::Object(resolved);
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn fmt_dur(d: std::time::Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{ms:.1}ms")
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
