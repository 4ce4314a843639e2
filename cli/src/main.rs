mod service;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use service::Warehouse;
use std::path::{Path, PathBuf};
use wh_common::db::core::GridLayout;
use wh_common::db::parser::events::VisitEvent;
use wh_common::db::parser::{events, layout};
use wh_common::geom::coord::GridCoord;
use wh_common::geom::rect::GridRect;
use wh_common::util::clock::Timestamp;
use wh_common::util::config::Config;
use wh_common::util::{check, generator, logger, visualization};
use wh_router::{RouteRequest, RouteResult};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Route {
        #[arg(long, conflicts_with = "request")]
        bins: Option<String>,
        #[arg(long, value_name = "FILE")]
        request: Option<PathBuf>,
    },
    Path {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    Heatmap {
        #[arg(long)]
        bounds: Option<String>,
        #[arg(long)]
        at: Option<u64>,
    },
    Advise {
        #[arg(long)]
        at: Option<u64>,
    },
    Replay {
        #[arg(long)]
        at: Option<u64>,
    },
    Generate {
        #[arg(long, default_value_t = 40)]
        width: u32,
        #[arg(long, default_value_t = 30)]
        height: u32,
        #[arg(long, default_value_t = 8)]
        cross_aisle_every: u32,
        #[arg(long, default_value_t = 0.6)]
        bin_density: f64,
        #[arg(long, default_value_t = 5000)]
        events: usize,
        #[arg(long, default_value_t = 48)]
        span_hours: u64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();
    let config = load_config(&args.config)?;

    let command = args.command.unwrap_or(Commands::Replay { at: None });

    match command {
        Commands::Generate {
            width,
            height,
            cross_aisle_every,
            bin_density,
            events: count,
            span_hours,
            seed,
        } => run_generate(
            &config,
            width,
            height,
            cross_aisle_every,
            bin_density,
            count,
            span_hours,
            seed,
        )?,
        Commands::Route { bins, request } => {
            let wh = open_warehouse(config)?;
            let result = match (bins, request) {
                (Some(list), _) => wh.plan(&RouteRequest::new(
                    list.split(',').map(str::trim).filter(|s| !s.is_empty()),
                ))?,
                (None, Some(path)) => {
                    let body = std::fs::read_to_string(&path)
                        .map_err(|e| anyhow::anyhow!("Failed to read request {:?}: {}", path, e))?;
                    wh.plan_path(&body)?
                }
                (None, None) => return Err(anyhow::anyhow!("route needs --bins or --request")),
            };
            if run_route_check(&wh, &result).is_err() {
                std::process::exit(1);
            }
            println!("{}", serde_json::to_string_pretty(&result)?);

            let layout = wh.layout()?;
            let png = output_path(wh.config(), "route.png")?;
            visualization::draw_floor(&layout, &[], Some(result.path.as_slice()), &png, 16)?;
            log::info!("Route drawn to {}", png);
        }
        Commands::Path { from, to } => {
            let (from, to) = (parse_coord(&from)?, parse_coord(&to)?);
            let wh = open_warehouse(config)?;
            let leg = wh.shortest_path(from, to)?;
            println!("{}", serde_json::to_string_pretty(&leg)?);
        }
        Commands::Heatmap { bounds, at } => {
            let bounds = bounds.as_deref().map(parse_bounds).transpose()?;
            let (wh, now) = open_with_events(config, at)?;
            let cells = wh.query_heatmap(bounds, now)?;
            println!("{}", serde_json::to_string_pretty(&cells)?);
        }
        Commands::Advise { at } => {
            let (wh, now) = open_with_events(config, at)?;
            let suggestions = wh.suggest_rebalancing(now)?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
        Commands::Replay { at } => {
            // Feed events one at a time, as the live service would, with the
            // eviction sweeper running alongside on the replay clock.
            let wh = open_warehouse(config)?;
            let visits = load_events(wh.config())?;
            let now = evaluation_time(at, &visits);
            let mut sweeper = wh.start_sweeper(move || now)?;
            let mut dropped = 0usize;
            for ev in &visits {
                if !wh.record_visit_event(ev)? {
                    dropped += 1;
                }
            }
            sweeper.stop();
            if dropped > 0 {
                log::warn!("{} of {} events were dropped", dropped, visits.len());
            }

            let cells = wh.query_heatmap(None, now)?;
            let total: f64 = cells.iter().map(|c| c.score).sum();
            log::info!(
                "{} active cells, total activity {:.2} at t={}ms",
                cells.len(),
                total,
                now.millis()
            );
            let mut hottest: Vec<_> = cells.iter().collect();
            hottest.sort_by(|a, b| b.score.total_cmp(&a.score));
            for cell in hottest.into_iter().take(5) {
                log::info!("  hot cell ({}, {}) score {:.3}", cell.coord.x, cell.coord.y, cell.score);
            }

            let suggestions = wh.suggest_rebalancing(now)?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);

            let layout = wh.layout()?;
            let heat: Vec<(GridCoord, f64)> = cells.iter().map(|c| (c.coord, c.score)).collect();
            let png = output_path(wh.config(), "heatmap.png")?;
            visualization::draw_floor(&layout, &heat, None, &png, 16)?;
            log::info!("Heat map drawn to {}", png);
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        log::info!("Loading configuration from {:?}", path);
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        parse_config(&config_str)
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            path
        );
        Ok(Config::default())
    }
}

fn parse_config(text: &str) -> anyhow::Result<Config> {
    toml::from_str(text).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))
}

fn load_layout(config: &Config) -> anyhow::Result<GridLayout> {
    let path = &config.input.layout_file;
    if !Path::new(path).exists() {
        return Err(anyhow::anyhow!(
            "Layout file missing: '{}'. Did you run 'generate'?",
            path
        ));
    }
    log::info!("Parsing layout: {}", path);
    layout::parse(path).map_err(|e| anyhow::anyhow!("Invalid layout in '{}': {}", path, e))
}

fn open_warehouse(config: Config) -> anyhow::Result<Warehouse> {
    let floor = load_layout(&config)?;
    let wh = Warehouse::new(config);
    wh.publish_layout(floor);
    Ok(wh)
}

fn load_events(config: &Config) -> anyhow::Result<Vec<VisitEvent>> {
    let path = &config.input.events_file;
    if !Path::new(path).exists() {
        log::warn!("Events file '{}' not found; heatmap starts empty", path);
        return Ok(Vec::new());
    }
    log::info!("Parsing events: {}", path);
    events::parse(path).map_err(|e| anyhow::anyhow!("Invalid events in '{}': {}", path, e))
}

// Without --at the heatmap is read as of the newest event.
fn evaluation_time(at: Option<u64>, visits: &[VisitEvent]) -> Timestamp {
    at.map(Timestamp).unwrap_or_else(|| {
        visits
            .iter()
            .map(|e| e.at)
            .max()
            .unwrap_or_else(Timestamp::now)
    })
}

fn open_with_events(config: Config, at: Option<u64>) -> anyhow::Result<(Warehouse, Timestamp)> {
    let wh = open_warehouse(config)?;
    let visits = load_events(wh.config())?;
    wh.replay(&visits)?;
    Ok((wh, evaluation_time(at, &visits)))
}

fn run_route_check(wh: &Warehouse, result: &RouteResult) -> anyhow::Result<()> {
    let layout = wh.layout()?;
    let stops: Vec<GridCoord> = result
        .ordered_bins
        .iter()
        .map(|id| layout.bin_cell(id))
        .collect::<Result<_, _>>()?;
    check::verify_route(
        &layout,
        result.depot,
        &result.path,
        &stops,
        result.total_distance,
    )
    .map_err(|e| anyhow::anyhow!("Route verification failed: {}", e))
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    config: &Config,
    width: u32,
    height: u32,
    cross_aisle_every: u32,
    bin_density: f64,
    count: usize,
    span_hours: u64,
    seed: u64,
) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let floor = generator::generate_layout(&mut rng, width, height, cross_aisle_every, bin_density)?;

    let span_ms = span_hours.saturating_mul(3_600_000);
    let start = Timestamp(Timestamp::now().millis().saturating_sub(span_ms));
    let visits = generator::generate_events(&mut rng, &floor, count, start, span_ms);

    prepare_output_dir(&config.input.layout_file)?;
    prepare_output_dir(&config.input.events_file)?;
    layout::write(&floor, &config.input.layout_file)?;
    events::write(&visits, &config.input.events_file)?;
    log::info!(
        "Generated {} ({} bins) and {} ({} events)",
        config.input.layout_file,
        floor.num_bins(),
        config.input.events_file,
        visits.len()
    );
    Ok(())
}

fn parse_numbers(s: &str) -> anyhow::Result<Vec<u32>> {
    s.split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| anyhow::anyhow!("Invalid number list '{}': {}", s, e))
}

fn parse_coord(s: &str) -> anyhow::Result<GridCoord> {
    match parse_numbers(s)?[..] {
        [x, y] => Ok(GridCoord::new(x, y)),
        _ => Err(anyhow::anyhow!("Cell must be x,y, got '{}'", s)),
    }
}

fn parse_bounds(s: &str) -> anyhow::Result<GridRect> {
    match parse_numbers(s)?[..] {
        [x0, y0, x1, y1] => Ok(GridRect::new(x0, y0, x1, y1)),
        _ => Err(anyhow::anyhow!("Bounds must be x0,y0,x1,y1, got '{}'", s)),
    }
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent()
        && !parent.exists()
        && !parent.as_os_str().is_empty()
    {
        log::info!("Creating output directory: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn output_path(config: &Config, file: &str) -> anyhow::Result<String> {
    let path = Path::new(&config.input.output_dir).join(file);
    let path = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Output path {:?} is not valid UTF-8", path))?
        .to_string();
    prepare_output_dir(&path)?;
    Ok(path)
}
