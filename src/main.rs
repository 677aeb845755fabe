use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use bodylink::logging::{LogLevel, init_logging};
use bodylink::shm::{COLOR_REGION_NAME, DEPTH_REGION_NAME};
use bodylink::{AbsentSensor, Bridge, BridgeConfig, RecordingSource, Result, SensorSource, Shutdown, exit};

/// Grace period for blocked stdio tasks once the session has ended.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(
    name = "bodylink",
    version,
    about = "Bridge body-tracking data to a consumer over stdin/stdout and shared frame buffers"
)]
struct Cli {
    /// Replay body frames from a YAML recording instead of a live sensor.
    #[arg(long, value_name = "PATH", env = "BODYLINK_RECORDING")]
    recording: Option<PathBuf>,

    /// Restart the recording after its last frame.
    #[arg(long = "loop", env = "BODYLINK_LOOP")]
    looping: bool,

    /// Interval between pings, e.g. `10s` or `500ms`.
    #[arg(long, value_name = "DURATION", default_value = "10s", value_parser = parse_duration, env = "BODYLINK_PING_INTERVAL")]
    ping_interval: Duration,

    /// Unacknowledged pings tolerated before exiting.
    #[arg(long, value_name = "COUNT", default_value_t = 2, env = "BODYLINK_MAX_MISSED_PINGS")]
    max_missed_pings: u32,

    /// Outbound queue capacity in lines.
    #[arg(long, value_name = "LINES", default_value_t = 64, env = "BODYLINK_OUTBOUND_CAPACITY")]
    outbound_capacity: usize,

    /// Copy color and depth rasters into the shared frame buffers.
    #[arg(long, env = "BODYLINK_WRITE_RASTERS")]
    write_rasters: bool,

    /// Directory for the shared buffer backing files (Unix only).
    #[arg(long, value_name = "DIR", env = "BODYLINK_SHM_DIR")]
    shm_dir: Option<PathBuf>,

    #[arg(long, value_name = "NAME", default_value = COLOR_REGION_NAME, env = "BODYLINK_COLOR_REGION")]
    color_region: String,

    #[arg(long, value_name = "NAME", default_value = DEPTH_REGION_NAME, env = "BODYLINK_DEPTH_REGION")]
    depth_region: String,

    /// Consecutive source errors before acquisition stops.
    #[arg(long, value_name = "COUNT", default_value_t = 10, env = "BODYLINK_MAX_SOURCE_ERRORS")]
    max_source_errors: u32,

    /// Longest wait for queued lines to reach the consumer on a clean exit.
    #[arg(long, value_name = "DURATION", default_value = "2s", value_parser = parse_duration, env = "BODYLINK_DRAIN_TIMEOUT")]
    drain_timeout: Duration,

    /// Minimum log level (stderr). `RUST_LOG` overrides it.
    #[arg(long, value_name = "LEVEL", default_value = "info", env = "BODYLINK_LOG_LEVEL")]
    log_level: LogLevel,
}

impl Cli {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            ping_interval: self.ping_interval,
            max_missed_pings: self.max_missed_pings,
            outbound_capacity: self.outbound_capacity,
            write_rasters: self.write_rasters,
            shm_dir: self.shm_dir.clone(),
            color_region_name: self.color_region.clone(),
            depth_region_name: self.depth_region.clone(),
            max_source_errors: self.max_source_errors,
            drain_timeout: self.drain_timeout,
        }
    }
}

fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number.parse().map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis { Duration::from_millis(value) } else { Duration::from_secs(value) })
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are reported through the same path
            let code = if err.use_stderr() { exit::USAGE } else { exit::SUCCESS };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.log_level);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            exit::FAILURE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.bridge_config();
    info!(?config, "Starting bodylink");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let outcome = match &cli.recording {
        Some(path) => {
            let source = RecordingSource::open(path)
                .with_context(|| format!("failed to load recording {}", path.display()))?
                .with_looping(cli.looping);
            info!(frames = source.total_frames(), seconds = source.duration(), "Replaying recording");
            runtime.block_on(session(config, source))
        }
        None => {
            warn!("No recording given and no sensor backend attached");
            runtime.block_on(session(config, AbsentSensor))
        }
    };

    // Stdin reads block a runtime thread that cannot be cancelled.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    if let Err(e) = &outcome {
        for suggestion in e.recovery_suggestions() {
            info!("Suggestion: {suggestion}");
        }
    }
    Ok(exit::code_for(&outcome))
}

async fn session<S: SensorSource>(config: BridgeConfig, source: S) -> Result<Shutdown> {
    Bridge::new(config, source).run(tokio::io::stdin(), tokio::io::stdout()).await
}
