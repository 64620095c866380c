use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grid geometry for a canvas. When `snap` is off the effective pitch is
/// `(1, 1)`: every integer coordinate is a grid point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    pub x: i32,
    pub y: i32,
    pub snap: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x: 10,
            y: 10,
            snap: true,
        }
    }
}

impl GridConfig {
    /// Effective pitch after accounting for the snap toggle.
    pub fn pitch(&self) -> (i32, i32) {
        if self.snap {
            (self.x.max(1), self.y.max(1))
        } else {
            (1, 1)
        }
    }
}

/// Routing style used when generating wire segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteMode {
    /// A single segment straight to the target, whatever its orientation.
    Direct,
    /// Orthogonal L/Z candidates scored against routing-matrix occupancy.
    Orthogonal,
}

/// Jump-cross behaviour when a routed segment crosses an existing wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpMode {
    None,
    /// Crossing segments carry the jump-marker visual attribute.
    Marked,
    /// Crossing segments are produced with no special attribute.
    Plain,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Mode used for per-frame routing while a drag is in progress.
    pub drag_mode: RouteMode,
    /// Mode used for the final route when an operation completes.
    pub final_mode: RouteMode,
    pub drag_jump: JumpMode,
    pub final_jump: JumpMode,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            drag_mode: RouteMode::Direct,
            final_mode: RouteMode::Orthogonal,
            drag_jump: JumpMode::None,
            final_jump: JumpMode::Marked,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub router: RouterConfig,
}

/// Load a config JSON file over the defaults. A missing path yields the
/// defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
