use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info
};

use crate::calendar::{
  CalendarRange,
  DEFAULT_DISPLAY_BUFFER_DAYS,
  DEFAULT_LEAD_DAYS,
  DEFAULT_SPAN_DAYS
};

pub const CONFIG_FILE: &str =
  "reservation-picker.toml";
pub const CONFIG_ENV_VAR: &str =
  "RESERVATION_PICKER_CONFIG";
const DEFAULT_DATA_DIR: &str =
  "~/.reservation-picker";
const DEFAULT_EDGE_THRESHOLD: usize = 10;

fn config_true() -> bool {
  true
}

fn default_span_days() -> u32 {
  DEFAULT_SPAN_DAYS
}

fn default_lead_days() -> u32 {
  DEFAULT_LEAD_DAYS
}

fn default_display_buffer_days() -> u32
{
  DEFAULT_DISPLAY_BUFFER_DAYS
}

fn default_edge_threshold() -> usize {
  DEFAULT_EDGE_THRESHOLD
}

fn default_data_dir() -> String {
  DEFAULT_DATA_DIR.to_string()
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct PickerConfig {
  #[serde(default)]
  pub timezone:  Option<String>,
  #[serde(default)]
  pub window:    WindowConfig,
  #[serde(default)]
  pub selection: SelectionConfig,
  #[serde(default)]
  pub display:   DisplayConfig,
  #[serde(default)]
  pub storage:   StorageConfig
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct WindowConfig {
  #[serde(default = "default_span_days")]
  pub span_days: u32,
  #[serde(default = "default_lead_days")]
  pub lead_days: u32,
  #[serde(
    default = "default_display_buffer_days"
  )]
  pub display_buffer_days: u32,
  #[serde(
    default = "default_edge_threshold"
  )]
  pub edge_threshold: usize
}

impl Default for WindowConfig {
  fn default() -> Self {
    Self {
      span_days: default_span_days(),
      lead_days: default_lead_days(),
      display_buffer_days:
        default_display_buffer_days(),
      edge_threshold:
        default_edge_threshold()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct SelectionConfig {
  #[serde(default = "config_true")]
  pub date_toggle_off:    bool,
  #[serde(default = "config_true")]
  pub validate_time_taps: bool
}

impl Default for SelectionConfig {
  fn default() -> Self {
    Self {
      date_toggle_off:    true,
      validate_time_taps: true
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct DisplayConfig {
  #[serde(default = "config_true")]
  pub color: bool
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self { color: true }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct StorageConfig {
  #[serde(default = "default_data_dir")]
  pub data_dir: String
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir()
    }
  }
}

impl PickerConfig {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) = resolve_config_path(
      config_override
    )?
    else {
      debug!(
        "no picker config found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading picker config");
    let raw = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    Self::from_toml(&raw).with_context(
      || {
        format!(
          "failed to parse {}",
          path.display()
        )
      }
    )
  }

  pub fn from_toml(
    raw: &str
  ) -> anyhow::Result<Self> {
    let mut cfg =
      toml::from_str::<PickerConfig>(raw)?;
    cfg.sanitize();
    debug!(?cfg, "parsed picker config");
    Ok(cfg)
  }

  pub fn calendar_range(
    &self
  ) -> CalendarRange {
    CalendarRange::new(
      self.window.span_days,
      self.window.lead_days,
      self.window.display_buffer_days
    )
  }

  fn sanitize(&mut self) {
    if self.window.span_days == 0 {
      self.window.span_days =
        default_span_days();
    }
    if self.window.lead_days
      >= self.window.span_days
    {
      self.window.lead_days =
        self.window.span_days - 1;
    }
    if self
      .timezone
      .as_deref()
      .is_some_and(|tz| {
        tz.trim().is_empty()
      })
    {
      self.timezone = None;
    }
    if self
      .storage
      .data_dir
      .trim()
      .is_empty()
    {
      self.storage.data_dir =
        default_data_dir();
    }
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &PickerConfig,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = match override_dir {
    | Some(path) => path.to_path_buf(),
    | None => {
      expand_tilde(Path::new(
        &cfg.storage.data_dir
      ))
    }
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    let path = expand_tilde(path);
    if !path.exists() {
      return Err(anyhow!(
        "config file does not exist: \
         {}",
        path.display()
      ));
    }
    return Ok(Some(path));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Ok(Some(expand_tilde(
        Path::new(trimmed)
      )));
    }
  }

  let candidate = std::env::current_dir()
    .context(
      "cannot determine current \
       directory"
    )?
    .join(CONFIG_FILE);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
