//! Export configuration.

use serde::{Deserialize, Serialize};

use crate::player::ScopePolicy;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Master switch; when false the dispatcher returns without touching
    /// anything.
    pub export_animation: bool,
    /// Which animation-player scope owns each entity's exported animation.
    pub scope: ScopePolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_animation: true,
            scope: ScopePolicy::PerObject,
        }
    }
}
