use serde::{Deserialize, Serialize};

use crate::graph::DockParameters;
use crate::id::TaskId;
use crate::task::TaskProfile;

/// The dispatcher-to-fleet command to commit or revoke a task.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum DispatchMethod {
    Add,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub task_profile: TaskProfile,
    pub fleet_name: String,
    pub method: DispatchMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchAck {
    pub request: DispatchRequest,
    pub success: bool,
}

impl DispatchAck {
    pub fn new(request: DispatchRequest, success: bool) -> Self {
        Self { request, success }
    }
}

/// Per-fleet cleaning dock parameters. A fleet keeps the params of the last
/// summary that names it, keyed by dock start waypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockSummary {
    pub docks: Vec<Dock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dock {
    pub fleet_name: String,
    pub params: Vec<DockParameters>,
}

/// A periodic snapshot of the robots in a fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetState {
    pub name: String,
    pub robots: Vec<RobotSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotSummary {
    pub name: String,
    /// The state of charge, as a percentage.
    pub battery_percent: f64,
    /// The task the robot is currently executing, if any.
    pub task_id: Option<TaskId>,
}
