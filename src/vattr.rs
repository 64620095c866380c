use serde::{Deserialize, Serialize};

/// Visual attributes carried by connectors and individual segments.
///
/// The engine never interprets these beyond copying them around during
/// merges and splits; they exist so a renderer on top of the core can
/// draw wires without a side table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisAttr {
    pub color: String,
    pub width: f32,
    pub dash: Option<String>,
    pub junction_radius: f32,
}

impl Default for VisAttr {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 1.0,
            dash: None,
            junction_radius: 3.0,
        }
    }
}

impl VisAttr {
    /// Attribute stamped on jump-cross segments produced by the router in
    /// marked mode.
    pub fn jump_marker() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 1.0,
            dash: Some("2,2".to_string()),
            junction_radius: 3.0,
        }
    }
}
