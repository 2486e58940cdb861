//! Generator lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`super::Generator`]
///
/// Transitions only go forward: `Original -> Started -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenStatus {
    /// Constructed, not running
    #[default]
    Original,
    /// Dispatch loop active (including while a shutdown is in progress)
    Started,
    /// Shutdown complete; terminal
    Stopped,
}

impl fmt::Display for GenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenStatus::Original => "original",
            GenStatus::Started => "started",
            GenStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
