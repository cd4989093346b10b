use std::cell::RefCell;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use catalog::{LayerCatalog, presets};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use controller::{PlaybackConfig, PlaybackEngine, Session};
use foundation::date::{Clock, FixedClock, SystemClock, format_date, parse_date};
use labels::{LabelClient, NewLabel, write_snapshot};
use layers::{HeadlessMap, RenderedLayerSet, TileCoord};
use runtime::{FrameRange, FrameSequencer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LABELS_URL: &str = "http://127.0.0.1:9200";

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless planetary imagery explorer")]
struct Args {
    /// Built-in catalog to use (earth, mars)
    #[arg(long, default_value = "earth")]
    world: String,

    /// Load the layer catalog from a JSON file instead
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, value_parser = date_arg)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a share query and print the resulting view
    View {
        #[arg(default_value = "")]
        query: String,

        /// Path prefix for the printed share link
        #[arg(long, default_value = "/")]
        share_path: String,
    },

    /// Print the frames of a date range
    Frames(RangeArgs),

    /// Play frames on a headless map
    Play {
        #[arg(long, default_value = "")]
        query: String,

        #[command(flatten)]
        range: RangeArgs,

        #[arg(long, default_value_t = 500)]
        delay_ms: u64,

        #[arg(long, default_value_t = 7000)]
        settle_ms: u64,

        /// Stop at the last frame instead of wrapping
        #[arg(long)]
        no_loop: bool,

        /// Stop after this many frames
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Fly to "lat,lon" and print the new share query
    Goto {
        target: String,

        #[arg(long, default_value = "")]
        query: String,
    },

    /// Read, add or download labels
    Labels {
        /// Label server base URL (default: $HORIZONS_LABELS_URL)
        #[arg(long)]
        labels_url: Option<String>,

        #[command(subcommand)]
        action: LabelAction,
    },
}

#[derive(ClapArgs, Debug, Clone, Copy)]
struct RangeArgs {
    #[arg(long, value_parser = date_arg)]
    from: Option<NaiveDate>,

    #[arg(long, value_parser = date_arg)]
    to: Option<NaiveDate>,

    /// Days between frames
    #[arg(long, default_value_t = 1)]
    step: u32,
}

#[derive(Subcommand, Debug)]
enum LabelAction {
    List,

    Add {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        desc: Option<String>,
    },

    /// Save a JSON snapshot named <world>-labels-<date>.json
    Download {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got {raw:?}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let catalog = Arc::new(load_catalog(&args.world, args.catalog.as_ref())?);
    let clock: Arc<dyn Clock> = match args.today {
        Some(day) => Arc::new(FixedClock(day)),
        None => Arc::new(SystemClock),
    };

    match args.command {
        Command::View { query, share_path } => {
            let session = start_session(catalog, clock, &query)?;
            println!("{}", describe(&session));
            println!("share: {}", session.share_url(&share_path));
        }
        Command::Frames(range) => {
            let sequencer = FrameSequencer::new(clock);
            for date in sequencer.build(range.resolve(&sequencer)).dates() {
                println!("{}", format_date(*date));
            }
        }
        Command::Play {
            query,
            range,
            delay_ms,
            settle_ms,
            no_loop,
            limit,
        } => {
            let config = PlaybackConfig {
                frame_delay: Duration::from_millis(delay_ms),
                settle_timeout: Duration::from_millis(settle_ms),
                looping: !no_loop,
            };
            let session = RefCell::new(start_session(catalog, Arc::clone(&clock), &query)?);
            let sequencer = FrameSequencer::new(clock);
            let range = range.resolve(&sequencer);
            let engine = PlaybackEngine::new(sequencer, config);
            engine.set_range(&session, range)?;
            let shown = play(&engine, &session, limit).await;
            for line in shown {
                println!("{line}");
            }
        }
        Command::Goto { target, query } => {
            let mut session = start_session(catalog, clock, &query)?;
            match session.goto(&target) {
                Ok(pos) => {
                    info!("flew to {:.5},{:.5}", pos.lat, pos.lon);
                    println!("{}", session.query());
                }
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            }
        }
        Command::Labels { labels_url, action } => {
            let base = labels_url
                .or_else(|| env::var("HORIZONS_LABELS_URL").ok())
                .unwrap_or_else(|| DEFAULT_LABELS_URL.to_string());
            let client = LabelClient::new(base);
            let world = catalog.world().to_string();
            match action {
                LabelAction::List => {
                    for label in client.fetch_all_or_empty(&world).await {
                        println!("{}", serde_json::to_string(&label)?);
                    }
                }
                LabelAction::Add {
                    lat,
                    lng,
                    title,
                    desc,
                } => {
                    let label = NewLabel {
                        lat,
                        lng,
                        title,
                        desc,
                    };
                    let count = client.append(&world, label).await?;
                    println!("ok ({count} labels for {world})");
                }
                LabelAction::Download { out } => {
                    let labels = client.fetch_all_or_empty(&world).await;
                    let path = write_snapshot(&out, &world, clock.today(), &labels).await?;
                    println!("{}", path.display());
                }
            }
        }
    }
    Ok(())
}

impl RangeArgs {
    /// Missing ends default to the week ending today.
    fn resolve(self, sequencer: &FrameSequencer) -> FrameRange {
        let default = sequencer.default_range();
        FrameRange::new(
            self.from.unwrap_or(default.from),
            self.to.unwrap_or(default.to),
            self.step,
        )
    }
}

fn load_catalog(world: &str, path: Option<&PathBuf>) -> Result<LayerCatalog, Box<dyn Error>> {
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path)?;
        return Ok(LayerCatalog::from_json(&raw)?);
    }
    presets::by_world(world)
        .ok_or_else(|| format!("unknown world {world:?} (try earth or mars)").into())
}

fn start_session(
    catalog: Arc<LayerCatalog>,
    clock: Arc<dyn Clock>,
    query: &str,
) -> Result<Session<HeadlessMap>, Box<dyn Error>> {
    let home = catalog.home();
    let mut session = Session::new(catalog, clock, HeadlessMap::new(home.center, home.zoom));
    let issues = session.start(query)?;
    if !issues.is_empty() {
        warn!("{} url parameter(s) ignored", issues.len());
    }
    Ok(session)
}

/// Human-readable summary of what the session shows.
fn describe(session: &Session<HeadlessMap>) -> String {
    let view = session.view();
    let mut out = vec![
        format!("query: {}", session.query()),
        format!(
            "camera: {:.5},{:.5} z{} (cap {})",
            view.center.lat,
            view.center.lon,
            view.zoom,
            session.effective_cap()
        ),
    ];
    match session.rendered() {
        Some(RenderedLayerSet::Single { layer }) => {
            out.push(format!("single: {} @ {}", layer.key, format_date(layer.date)));
        }
        Some(RenderedLayerSet::Compare {
            bottom,
            top,
            opacity_percent,
        }) => {
            out.push(format!("bottom: {} @ {}", bottom.key, format_date(bottom.date)));
            out.push(format!(
                "top: {} @ {} ({opacity_percent}%)",
                top.key,
                format_date(top.date)
            ));
        }
        None => out.push("no layers".to_string()),
    }
    for handle in session.active_handles() {
        if let Some(layer) = session.map().layer(handle) {
            let tile = layer.source.url(TileCoord::new(view.zoom, 0, 0));
            out.push(format!("tile: {tile}"));
        }
    }
    out.join("\n")
}

/// Run playback, pausing after `limit` frames. Returns the frames shown.
async fn play(
    engine: &PlaybackEngine,
    session: &RefCell<Session<HeadlessMap>>,
    limit: Option<usize>,
) -> Vec<String> {
    let mut shown = Vec::new();
    let outcome = engine
        .play_with(session, |date| {
            shown.push(format_date(date));
            if limit.is_some_and(|n| shown.len() >= n) {
                engine.pause();
            }
        })
        .await;
    info!("playback ended after {} frame(s): {outcome:?}", shown.len());
    shown
}
