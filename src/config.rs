use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::render::Bounds;

pub const DEFAULT_CONTROL_SOCKET_PATH: &str = "/run/mail-frame/control.sock";
pub const DEFAULT_QUERY: &str = "label:jordscreen";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Display width in pixels; frames are scaled down to fit.
    pub width: u32,
    /// Display height in pixels.
    pub height: u32,
    /// PNG the file renderer atomically replaces on every frame.
    pub output_path: PathBuf,
}

impl DisplayConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            output_path: PathBuf::from("frame.png"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root of the local mirror of the mailbox.
    pub spool_path: PathBuf,
    /// Directory holding one cached attachment per message id.
    pub cache_path: PathBuf,
    /// Listing query selecting the messages to show.
    pub query: String,
    /// Time each image stays on screen before auto-advancing.
    pub seconds_per_image: u64,
    /// Re-list messages whenever navigation wraps around the list.
    pub auto_refresh_on_wraparound: bool,
    /// How often the empty screen re-lists messages looking for content.
    #[serde(with = "humantime_serde")]
    pub empty_refresh_interval: Duration,
    /// Display surface settings.
    pub display: DisplayConfig,
    /// Unix domain socket accepting runtime control commands.
    pub control_socket_path: PathBuf,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.seconds_per_image > 0,
            "seconds-per-image must be greater than zero"
        );
        ensure!(
            !self.empty_refresh_interval.is_zero(),
            "empty-refresh-interval must be positive"
        );
        ensure!(
            self.display.width > 0 && self.display.height > 0,
            "display width and height must be greater than zero"
        );
        ensure!(
            !self.cache_path.as_os_str().is_empty(),
            "cache-path must not be empty"
        );
        ensure!(
            self.display.output_path.file_name().is_some(),
            "display.output-path must include a file name"
        );
        ensure!(
            self.control_socket_path.file_name().is_some(),
            "control-socket-path must include a socket file name"
        );
        ensure!(!self.query.trim().is_empty(), "query must not be empty");
        Ok(self)
    }

    pub fn time_per_image(&self) -> Duration {
        Duration::from_secs(self.seconds_per_image)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            spool_path: PathBuf::from("spool"),
            cache_path: PathBuf::from("cache"),
            query: DEFAULT_QUERY.to_string(),
            seconds_per_image: 60,
            auto_refresh_on_wraparound: true,
            empty_refresh_interval: Duration::from_secs(5 * 60),
            display: DisplayConfig::default(),
            control_socket_path: PathBuf::from(DEFAULT_CONTROL_SOCKET_PATH),
        }
    }
}
