use seqtex::cli::{Args, Source};
use seqtex::config;
use seqtex::core::ImageSequence;
use seqtex::core::tick::TickSource;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Host tick interval while a background load runs
const TICK: Duration = Duration::from_millis(16);

fn init_logging(args: &Args, path_config: &config::PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &path_config)?;
    debug!("Command-line args: {:?}", args);

    let Some(source) = args.source() else {
        use clap::CommandFactory;
        Args::command().print_help()?;
        println!();
        bail!("nothing to load: pass a FOLDER or --prefix/--end");
    };

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(|| config::config_file(config::SETTINGS_FILE, &path_config));
    let mut settings = config::load_settings(&settings_path)?;

    if let Some(fps) = args.fps {
        settings.frame_rate = fps;
    }
    if let Some(max) = args.max_frames {
        settings.max_frames = max;
    }
    if let Some(ext) = &args.filter_ext {
        settings.extension = ext.clone();
    }
    settings.threaded |= args.threaded;

    let ticks = TickSource::new();
    let mut seq = ImageSequence::new()
        .with_tick_source(ticks.clone())
        .with_settings(&settings);

    let started = Instant::now();
    match &source {
        Source::Pattern { prefix, ext, start, end, digits } => {
            seq.load_from_pattern(prefix, ext, *start, *end, *digits)?;
        }
        Source::Folder(dir) => {
            seq.load_from_directory(dir)?;
        }
    }

    // Host loop for the background path: tick until the load deregisters
    while ticks.has_subscribers() {
        ticks.tick();
        seq.on_tick();
        std::thread::sleep(TICK);
    }

    if !seq.is_loaded() {
        bail!("sequence did not load (see log for details)");
    }

    println!(
        "{} frames, {}x{}, {:.3}s @ {} fps (loaded in {:.1?})",
        seq.total_frames(),
        seq.width(),
        seq.height(),
        seq.length_in_seconds(),
        seq.frame_rate(),
        started.elapsed()
    );

    if let Some(frame) = args.frame {
        seq.set_frame(frame);
        report(&seq, &format!("frame {}", frame));
    }
    for percent in &args.percents {
        seq.set_frame_at_percent(*percent);
        report(&seq, &format!("percent {}", percent));
    }
    for time in &args.times {
        seq.set_frame_for_time(*time);
        report(&seq, &format!("time {}s", time));
    }

    if let Some(path) = &args.dump {
        match seq.texture().to_dynamic_image() {
            Some(img) => {
                let img = if matches!(img, image::DynamicImage::ImageRgba32F(_)) && !is_float_target(path) {
                    image::DynamicImage::ImageRgba8(img.to_rgba8())
                } else {
                    img
                };
                img.save(path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Dumped frame {} to {}", seq.current_frame(), path.display());
            }
            None => warn!("Nothing to dump: texture is empty"),
        }
    }

    Ok(())
}

fn report(seq: &ImageSequence, query: &str) {
    let index = seq.current_frame();
    let name = seq
        .filename(index)
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    println!(
        "{:>14} -> #{} ({:.3}) {}",
        query,
        index,
        seq.percent_at_frame_index(index),
        name
    );
}

/// EXR keeps float RGBA as-is; other targets get 8-bit
fn is_float_target(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exr"))
}
