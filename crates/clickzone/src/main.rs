//! clickzone entry point.
//!
//! Swallows every physical left click and replays it inside a target zone,
//! keeping the click's relative position on the screen.
//!
//! # Usage
//!
//! ```text
//! clickzone -w <WIDTH> -h <HEIGHT> [-l <LEFT>] [-t <TOP>] [--mh[=BOOL]] [--mv[=BOOL]]
//!
//! Options:
//!   -w, --width  <PX>      Target zone width
//!   -h, --height <PX>      Target zone height
//!   -l, --left   <PX>      Zone left edge [default: 0]
//!   -t, --top    <PX>      Zone top edge [default: 0]
//!       --mh[=BOOL]        Mirror horizontally (`--mh=false` overrides the file)
//!       --mv[=BOOL]        Mirror vertically (`--mv=false` overrides the file)
//!       --config <PATH>    Config file (default: platform config dir)
//!       --log-level <LVL>  Log level when RUST_LOG is unset
//! ```
//!
//! `-h` is the zone height, so help is only available as `--help`.
//!
//! # Environment variable overrides
//!
//! | Variable                       | Option        |
//! |--------------------------------|---------------|
//! | `CLICKZONE_WIDTH`              | `--width`     |
//! | `CLICKZONE_HEIGHT`             | `--height`    |
//! | `CLICKZONE_LEFT`               | `--left`      |
//! | `CLICKZONE_TOP`                | `--top`       |
//! | `CLICKZONE_MIRROR_HORIZONTAL`  | `--mh`        |
//! | `CLICKZONE_MIRROR_VERTICAL`    | `--mv`        |
//! | `CLICKZONE_CONFIG`             | `--config`    |
//! | `CLICKZONE_LOG_LEVEL`          | `--log-level` |

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clickzone::infrastructure::storage::config::{
    load_config, load_config_from, AppConfig, ConfigError, ZoneOverrides,
};
use clickzone_core::TargetZone;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remaps physical left clicks into a target zone.
#[derive(Debug, Parser)]
#[command(name = "clickzone", version, disable_help_flag = true)]
struct Cli {
    /// Target zone width in pixels.
    #[arg(short = 'w', long, env = "CLICKZONE_WIDTH")]
    width: Option<u32>,

    /// Target zone height in pixels.
    #[arg(short = 'h', long, env = "CLICKZONE_HEIGHT")]
    height: Option<u32>,

    /// Left edge of the zone in screen pixels [default: 0].
    #[arg(short = 'l', long, env = "CLICKZONE_LEFT")]
    left: Option<u32>,

    /// Top edge of the zone in screen pixels [default: 0].
    #[arg(short = 't', long, env = "CLICKZONE_TOP")]
    top: Option<u32>,

    /// Mirror the horizontal position inside the zone (`--mh=false` turns
    /// off mirroring set in the config file).
    #[arg(
        long = "mh",
        env = "CLICKZONE_MIRROR_HORIZONTAL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    mirror_horizontal: Option<bool>,

    /// Mirror the vertical position inside the zone (`--mv=false` turns off
    /// mirroring set in the config file).
    #[arg(
        long = "mv",
        env = "CLICKZONE_MIRROR_VERTICAL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    mirror_vertical: Option<bool>,

    /// Path to a TOML config file.
    #[arg(long, env = "CLICKZONE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive, used when RUST_LOG is unset.
    #[arg(long, env = "CLICKZONE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn overrides(&self) -> ZoneOverrides {
        ZoneOverrides {
            width: self.width,
            height: self.height,
            left: self.left,
            top: self.top,
            mirror_horizontal: self.mirror_horizontal,
            mirror_vertical: self.mirror_vertical,
            log_level: self.log_level.clone(),
        }
    }

    /// Reads the config file (if any) and layers the command line over it.
    fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => match load_config() {
                Ok(config) => config,
                Err(ConfigError::NoPlatformConfigDir) => AppConfig::default(),
                Err(e) => return Err(e).context("failed to load config"),
            },
        };
        config.apply(&self.overrides());
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // RUST_LOG wins; otherwise the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let zone = config.target_zone().context("invalid target zone")?;
    info!(
        width = zone.width,
        height = zone.height,
        left = zone.left,
        top = zone.top,
        mirror_horizontal = zone.mirror_horizontal,
        mirror_vertical = zone.mirror_vertical,
        "clickzone starting"
    );

    run(zone).await
}

#[cfg(target_os = "windows")]
async fn run(zone: TargetZone) -> anyhow::Result<()> {
    use std::sync::Arc;

    use clickzone::application::hook_manager::HookManager;
    use clickzone::application::platform::{ClickInjector, HookPlatform};
    use clickzone::application::remap::RemapEngine;
    use clickzone::infrastructure::platform::windows::WindowsPlatform;

    let platform = Arc::new(WindowsPlatform::start().context("failed to start hook thread")?);
    let manager = HookManager::new(Arc::clone(&platform) as Arc<dyn HookPlatform>);
    let engine = RemapEngine::start(
        &manager,
        zone,
        Arc::clone(&platform) as Arc<dyn HookPlatform>,
        Arc::clone(&platform) as Arc<dyn ClickInjector>,
        tokio::runtime::Handle::current(),
    )
    .context("failed to start click remapping")?;

    info!("remapping clicks; press Ctrl-C to exit");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("shutting down");
    if let Err(e) = engine.stop() {
        tracing::warn!(error = %e, "mouse hook removal failed");
        return Err(e).context("failed to remove mouse hook");
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
async fn run(_zone: TargetZone) -> anyhow::Result<()> {
    use clickzone::application::platform::PlatformError;

    Err(PlatformError::Unsupported(format!(
        "global input hooks are only available on Windows, not {}",
        std::env::consts::OS
    )))
    .context("cannot start click remapping")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_h_is_height() {
        let cli = Cli::try_parse_from(["clickzone", "-w", "300", "-h", "500", "-l", "200", "-t", "200", "--mv"])
            .unwrap();

        assert_eq!(cli.width, Some(300));
        assert_eq!(cli.height, Some(500));
        assert_eq!(cli.left, Some(200));
        assert_eq!(cli.mirror_vertical, Some(true));
        assert_eq!(cli.mirror_horizontal, None);
    }

    #[test]
    fn test_overrides_build_the_expected_zone() {
        let cli = Cli::try_parse_from(["clickzone", "-w", "300", "-h", "500", "-l", "200", "-t", "200"])
            .unwrap();
        let mut config = AppConfig::default();

        config.apply(&cli.overrides());

        assert_eq!(config.target_zone().unwrap(), TargetZone::new(300, 500, 200, 200).unwrap());
    }

    #[test]
    fn test_mirror_flag_false_overrides_config_file() {
        // Arrange
        let cli = Cli::try_parse_from(["clickzone", "-w", "300", "-h", "500", "--mv=false"]).unwrap();
        let mut config = AppConfig::default();
        config.zone.mirror_vertical = true;

        // Act
        config.apply(&cli.overrides());

        // Assert
        assert_eq!(cli.mirror_vertical, Some(false));
        assert!(!config.target_zone().unwrap().mirror_vertical);
    }
}
