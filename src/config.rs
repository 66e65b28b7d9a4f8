//! Relay configuration.
//!
//! Defaults reproduce the fixed constants of the camera relay (JPEG quality 70,
//! 640x480 output, 30 Hz pacing, 5 s silence timeout). Any value can be
//! overridden from an INI file:
//!
//! ```ini
//! [video]
//! jpeg_quality = 70
//! width = 640
//! height = 480
//! ; sets capture_fps and broadcast_fps together
//! max_fps = 30
//!
//! [relay]
//! ; seconds
//! source_timeout = 5.0
//! poll_interval_ms = 10
//!
//! [server]
//! bind = 0.0.0.0:5000
//! static_dir = ./static
//!
//! [source]
//! kind = synthetic
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use configparser::ini::Ini;
use tracing::{debug, info};

use crate::error::{RelayError, Result};

/// Environment variable naming an INI file to load.
pub const CONFIG_ENV: &str = "CAMERA_RELAY_CONFIG";

/// Which upstream transport feeds the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Built-in moving test pattern; commands are logged.
    Synthetic,
    /// No upstream link. The relay reports itself uninitialized.
    Disabled,
}

impl std::str::FromStr for SourceKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(SourceKind::Synthetic),
            "disabled" | "none" => Ok(SourceKind::Disabled),
            other => Err(RelayError::Config(format!("unknown source kind '{}'", other))),
        }
    }
}

/// Geometry and rate of the synthetic test-pattern camera
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 15,
        }
    }
}

/// Complete relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Output frame width in pixels
    pub frame_width: u32,
    /// Output frame height in pixels
    pub frame_height: u32,
    /// Maximum inbound processing rate
    pub capture_fps: u32,
    /// Maximum broadcast rate
    pub broadcast_fps: u32,
    /// Silence after which the placeholder replaces the live frame
    pub source_timeout: Duration,
    /// Bounded wait for new inbound messages per capture iteration
    pub poll_interval: Duration,
    /// Delay after a failed capture iteration
    pub error_backoff: Duration,
    /// Broadcast loop sleep while no viewers are attached
    pub idle_interval: Duration,
    /// Outbound event queue depth per viewer
    pub viewer_queue: usize,
    /// HTTP listen address
    pub bind: SocketAddr,
    /// Directory holding the browser viewer assets
    pub static_dir: Option<PathBuf>,
    pub source: SourceKind,
    pub synthetic: SyntheticConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 70,
            frame_width: 640,
            frame_height: 480,
            capture_fps: 30,
            broadcast_fps: 30,
            source_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            error_backoff: Duration::from_millis(100),
            idle_interval: Duration::from_millis(100),
            viewer_queue: 4,
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            static_dir: None,
            source: SourceKind::Synthetic,
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Minimum spacing between processed inbound frames
    pub fn capture_interval(&self) -> Duration {
        fps_interval(self.capture_fps)
    }

    /// Minimum spacing between broadcasts
    pub fn broadcast_interval(&self) -> Duration {
        fps_interval(self.broadcast_fps)
    }

    /// Resolve and load configuration.
    ///
    /// Order: explicit path, then `CAMERA_RELAY_CONFIG`, then
    /// `<config_dir>/camera-relay/relay.ini` when present, then defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        let path = explicit
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                dirs::config_dir()
                    .map(|dir| dir.join("camera-relay").join("relay.ini"))
                    .filter(|p| p.exists())
            });

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_ini_file(&path)
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_ini_file(path: &Path) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ini(&ini)
    }

    pub fn from_ini_str(text: &str) -> Result<Self> {
        let mut ini = Ini::new();
        ini.read(text.to_string()).map_err(RelayError::Config)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let mut config = Self::default();

        if let Some(q) = get_uint(ini, "video", "jpeg_quality")? {
            config.jpeg_quality = u8::try_from(q)
                .map_err(|_| RelayError::Config(format!("jpeg_quality {} out of range", q)))?;
        }
        if let Some(w) = get_uint(ini, "video", "width")? {
            config.frame_width = to_u32("width", w)?;
        }
        if let Some(h) = get_uint(ini, "video", "height")? {
            config.frame_height = to_u32("height", h)?;
        }
        if let Some(fps) = get_uint(ini, "video", "max_fps")? {
            config.capture_fps = to_u32("max_fps", fps)?;
            config.broadcast_fps = config.capture_fps;
        }
        if let Some(fps) = get_uint(ini, "video", "capture_fps")? {
            config.capture_fps = to_u32("capture_fps", fps)?;
        }
        if let Some(fps) = get_uint(ini, "video", "broadcast_fps")? {
            config.broadcast_fps = to_u32("broadcast_fps", fps)?;
        }

        if let Some(secs) = get_float(ini, "relay", "source_timeout")? {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(RelayError::Config(format!("source_timeout {} must be positive", secs)));
            }
            config.source_timeout = Duration::from_secs_f64(secs);
        }
        if let Some(ms) = get_uint(ini, "relay", "poll_interval_ms")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = get_uint(ini, "relay", "error_backoff_ms")? {
            config.error_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = get_uint(ini, "relay", "idle_interval_ms")? {
            config.idle_interval = Duration::from_millis(ms);
        }
        if let Some(depth) = get_uint(ini, "relay", "viewer_queue")? {
            config.viewer_queue = depth as usize;
        }

        if let Some(bind) = ini.get("server", "bind") {
            config.bind = bind
                .trim()
                .parse()
                .map_err(|e| RelayError::Config(format!("bind '{}': {}", bind, e)))?;
        }
        if let Some(dir) = ini.get("server", "static_dir") {
            config.static_dir = Some(PathBuf::from(dir.trim()));
        }

        if let Some(kind) = ini.get("source", "kind") {
            config.source = kind.parse()?;
        }
        if let Some(w) = get_uint(ini, "source", "width")? {
            config.synthetic.width = to_u32("source width", w)?;
        }
        if let Some(h) = get_uint(ini, "source", "height")? {
            config.synthetic.height = to_u32("source height", h)?;
        }
        if let Some(fps) = get_uint(ini, "source", "fps")? {
            config.synthetic.fps = to_u32("source fps", fps)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RelayError::Config(format!(
                "jpeg_quality {} must be within 1..=100",
                self.jpeg_quality
            )));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(RelayError::Config("frame dimensions must be non-zero".into()));
        }
        if self.capture_fps == 0 || self.broadcast_fps == 0 || self.synthetic.fps == 0 {
            return Err(RelayError::Config("frame rates must be non-zero".into()));
        }
        if self.viewer_queue == 0 {
            return Err(RelayError::Config("viewer_queue must be at least 1".into()));
        }
        Ok(())
    }
}

fn fps_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

fn get_uint(ini: &Ini, section: &str, key: &str) -> Result<Option<u64>> {
    ini.getuint(section, key)
        .map_err(|e| RelayError::Config(format!("[{}] {}: {}", section, key, e)))
}

fn get_float(ini: &Ini, section: &str, key: &str) -> Result<Option<f64>> {
    ini.getfloat(section, key)
        .map_err(|e| RelayError::Config(format!("[{}] {}: {}", section, key, e)))
}

fn to_u32(name: &str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| RelayError::Config(format!("{} {} out of range", name, value)))
}
