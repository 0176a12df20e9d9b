//! Boxpanel - Raspberry Pi Home-Automation Panel Binary
//!
//! Serves the light switches, climate readings and camera feed over HTTP.

use boxpanel::{
    hardware, start_web_server, Panel, SensorRetryPolicy, WebConfig, DEFAULT_WEB_PORT,
};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "boxpanel")]
#[command(about = "Raspberry Pi home-automation panel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Web control panel for relay-switched lights, a DHT22 sensor and a camera feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve(ServeArgs),

    /// Take a single sensor reading and exit
    Read(ReadArgs),

    /// Show wiring and compiled hardware support
    Info,
}

#[derive(Args)]
struct ServeArgs {
    /// Static files directory
    #[arg(long, default_value = "static")]
    static_dir: String,

    /// Enable CORS headers
    #[arg(long)]
    cors: bool,

    /// Reject unknown relay names (404) and actions (400) instead of ignoring them
    #[arg(long)]
    strict_routes: bool,

    /// Give up on the sensor after this many reads (0 retries until it answers)
    #[arg(long, default_value_t = 0)]
    sensor_attempts: u32,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            static_dir: "static".to_string(),
            cors: false,
            strict_routes: false,
            sensor_attempts: 0,
        }
    }
}

#[derive(Args)]
struct ReadArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,

    /// Give up on the sensor after this many reads (0 retries until it answers)
    #[arg(long, default_value_t = 0)]
    sensor_attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args).await?,
        Some(Commands::Read(args)) => read_command(args).await?,
        Some(Commands::Info) => info_command(),
        None => serve_command(&cli, &ServeArgs::default()).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), &directives))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Level picked by the command-line flags.
fn log_level(cli: &Cli) -> LevelFilter {
    if cli.debug {
        LevelFilter::DEBUG
    } else if cli.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

/// `RUST_LOG` directives on top of the flag level; empty keeps the flag level.
fn log_filter(level: LevelFilter, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives)
}

fn retry_policy(attempts: u32) -> SensorRetryPolicy {
    match attempts {
        0 => SensorRetryPolicy::default(),
        n => SensorRetryPolicy::default().with_max_attempts(Some(n)),
    }
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    info!("Starting boxpanel...");

    let panel = Panel::with_default_hardware(retry_policy(args.sensor_attempts))?;
    info!("Panel hardware initialized");

    let web_config = WebConfig::new(&cli.host, cli.port)
        .with_static_path(Some(args.static_dir.clone()))
        .with_cors(args.cors)
        .with_strict_routes(args.strict_routes);

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Strict relay routes: {}", web_config.strict_routes);
    info!("  - Sensor attempts: {}", args.sensor_attempts);

    start_web_server(web_config, Arc::new(panel)).await?;

    Ok(())
}

async fn read_command(args: &ReadArgs) -> anyhow::Result<()> {
    let panel = Panel::with_default_hardware(retry_policy(args.sensor_attempts))?;
    let reading = panel.read_sensor().await;
    panel.shutdown().await;
    let reading = reading?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&reading)?),
        "pretty" => {
            println!("Temperature: {:.1}°C", reading.temperature);
            println!("Humidity:    {:.1}%", reading.humidity);
            println!(
                "Left light:  {} ({})",
                if reading.left_on() { "ON" } else { "OFF" },
                reading.relay1_state
            );
            println!(
                "Right light: {} ({})",
                if reading.right_on() { "ON" } else { "OFF" },
                reading.relay2_state
            );
        }
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

fn info_command() {
    println!("Boxpanel {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Wiring:");
    println!("  Left light relay:  GPIO {}", boxpanel::RELAY_LEFT_PIN);
    println!("  Right light relay: GPIO {}", boxpanel::RELAY_RIGHT_PIN);
    println!("  DHT22 data line:   GPIO {}", boxpanel::SENSOR_DATA_PIN);
    println!(
        "  Camera:            {}x{}, flipped",
        boxpanel::CAMERA_WIDTH,
        boxpanel::CAMERA_HEIGHT
    );
    println!();

    let features = hardware::compiled_features();
    println!("Features compiled:");
    println!(
        "  - GPIO + DHT22: {}",
        if features.contains(&"gpio") { "✓" } else { "✗ (simulated)" }
    );
    println!(
        "  - Camera:       {}",
        if features.contains(&"rpicam") { "✓" } else { "✗ (simulated)" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["boxpanel", "--port", "9090"]).unwrap();
        assert_eq!(cli.port, 9090);
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["boxpanel"]).unwrap();
        assert_eq!(cli.port, DEFAULT_WEB_PORT);
        assert_eq!(cli.host, "0.0.0.0");
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "boxpanel",
            "serve",
            "--strict-routes",
            "--sensor-attempts",
            "5",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Serve(args)) => {
                assert!(args.strict_routes);
                assert_eq!(retry_policy(args.sensor_attempts).max_attempts, Some(5));
            }
            _ => panic!("expected serve subcommand"),
        }
    }

    #[test]
    fn test_serve_defaults_are_lenient_and_unbounded() {
        let cli = Cli::try_parse_from(["boxpanel", "serve"]).unwrap();
        match cli.command {
            Some(Commands::Serve(args)) => {
                assert!(!args.strict_routes);
                assert_eq!(retry_policy(args.sensor_attempts).max_attempts, None);
            }
            _ => panic!("expected serve subcommand"),
        }
        assert!(!ServeArgs::default().strict_routes);
        assert_eq!(ServeArgs::default().sensor_attempts, 0);
    }

    #[test]
    fn test_log_level_follows_flags() {
        let level = |args: &[&str]| log_level(&Cli::try_parse_from(args).unwrap());

        assert_eq!(level(&["boxpanel"]), LevelFilter::WARN);
        assert_eq!(level(&["boxpanel", "--verbose"]), LevelFilter::INFO);
        assert_eq!(level(&["boxpanel", "--debug"]), LevelFilter::DEBUG);
    }

    #[test]
    fn test_log_filter_keeps_flag_level_without_directives() {
        let filter = log_filter(LevelFilter::DEBUG, "");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(LevelFilter::WARN, "");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = log_filter(LevelFilter::WARN, "trace");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_retry_policy_bound() {
        assert_eq!(retry_policy(3).max_attempts, Some(3));
        assert_eq!(retry_policy(0).max_attempts, None);
    }
}
