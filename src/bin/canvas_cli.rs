use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use button_canvas_client::state::{parse_fragment, resolve, ColorPreference, FileStore};
use button_canvas_client::{ClientBuilder, ClientConfig, GridPoint, TileState};

#[derive(Parser)]
#[command(name = "canvas-cli")]
#[command(about = "Command line client for the button canvas")]
struct Cli {
    /// Server base URL; overrides the config file and BUTTON_CANVAS_URL
    #[arg(long)]
    url: Option<String>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one tile
    Tile { x: i64, y: i64 },
    /// Press a button by its index on the tile
    Press {
        x: i64,
        y: i64,
        index: usize,
        /// Color to press with instead of the saved preference
        #[arg(long)]
        color: Option<String>,
    },
    Stats,
    /// Show or change the saved press color
    Color { hex: Option<String> },
    /// Resolve a `#x,y` fragment the way a browser load would
    Nav { fragment: String },
    /// Navigate and run scheduler passes until the viewport settles
    Watch {
        fragment: String,
        #[arg(long, default_value_t = 10)]
        max_ticks: u32,
    },
}

fn load_config(cli: &Cli) -> button_canvas_client::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_json_file(path)?,
        None => ClientConfig::from_env()?,
    };
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    Ok(config)
}

fn print_tile(tile: &TileState, columns: usize) {
    println!("tile {},{}  ({} pressed)", tile.x, tile.y, tile.pressed_count());
    for row in tile.buttons.chunks(columns.max(1)) {
        let line: String = row
            .iter()
            .map(|b| if b.is_pressed() { '#' } else { '.' })
            .collect();
        println!("  {line}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let columns = config.layout().row_length();

    match &cli.command {
        Commands::Tile { x, y } => {
            let point = GridPoint::new(*x, *y);
            let session = ClientBuilder::from_config(config).build()?;
            match session.gateway().fetch_tile(point).await {
                Some(tile) if cli.json => println!("{}", serde_json::to_string_pretty(&tile)?),
                Some(tile) => print_tile(&tile, columns),
                None => eprintln!("tile {point} unavailable"),
            }
        }
        Commands::Press { x, y, index, color } => {
            let point = GridPoint::new(*x, *y);
            let layout = config.layout();
            if *index >= layout.page_size {
                return Err(format!("index {index} outside tile of {}", layout.page_size).into());
            }
            let id = layout.button_id(point, *index);
            let mut session = ClientBuilder::from_config(config).build()?;
            if let Some(hex) = color {
                session.set_color(hex)?;
            }
            match session.press(point, id).await {
                Some(outcome) if cli.json => println!(
                    "{}",
                    json!({"success": outcome.success, "id": id, "tile": outcome.tile})
                ),
                Some(outcome) => {
                    let hex = outcome.tile.buttons.get(*index).and_then(|b| b.hex.clone());
                    if outcome.success {
                        println!("pressed b{id} with #{}", session.color());
                    } else {
                        println!("b{id} was already pressed ({})", hex.as_deref().unwrap_or("?"));
                    }
                }
                None => eprintln!("press on {point} failed"),
            }
        }
        Commands::Stats => {
            let session = ClientBuilder::from_config(config).build()?;
            let stats = session.stats().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                for stat in &stats {
                    println!("{:<24} {}", stat.stat_name, stat.value());
                }
            }
        }
        Commands::Color { hex } => {
            let mut pref = ColorPreference::load_or_init(Box::new(FileStore::open_default()));
            if let Some(hex) = hex {
                pref.set(hex)?;
            }
            println!("#{}  cursor {}", pref.hex(), pref.cursor_path());
        }
        Commands::Nav { fragment } => {
            let nav = resolve(fragment, config.grid_max_x, config.grid_max_y);
            if let Err(e) = parse_fragment(fragment, config.grid_max_x, config.grid_max_y) {
                eprintln!("{e}");
            }
            if cli.json {
                println!("{}", json!({"fragment": nav.point().fragment(), "redirect": nav.is_redirect()}));
            } else {
                println!("{}", nav.point().fragment());
            }
        }
        Commands::Watch { fragment, max_ticks } => {
            let mut session = ClientBuilder::from_config(config).connect(fragment).await?;
            let mut interval = session.scheduler().interval();
            for _ in 0..*max_ticks {
                interval.tick().await;
                let report = session.tick().await;
                if cli.json {
                    println!(
                        "{}",
                        json!({
                            "visible": report.visible,
                            "fetched": report.fetched,
                            "rendered": report.rendered,
                            "failed": report.failed,
                            "evicted": report.evicted,
                            "probed": report.probed,
                            "dirty": report.dirty,
                        })
                    );
                } else {
                    println!("{report:?}");
                }
                if !report.dirty {
                    break;
                }
            }
            let stats = session.renderer().stats();
            println!(
                "{} tiles cached, {} containers, {} buttons created",
                session.cache().len(),
                stats.containers_created,
                stats.buttons_created
            );
        }
    }

    Ok(())
}
