use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::graph::Trajectory;
use crate::id::TaskId;

/// The binary priority scheme used by the task planner.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BinaryPriority {
    Low,
    High,
}

/// A typed, graph-resolved task request as consumed by the task planner.
/// A fleet constructs one from a bid notice after validating the payload
/// against its navigation graph.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub id: TaskId,
    pub earliest_start_time: DateTime<Utc>,
    pub priority: BinaryPriority,
    pub detail: RequestDetail,
}

#[derive(Debug, Clone)]
pub enum RequestDetail {
    Clean {
        start_waypoint: usize,
        finish_waypoint: usize,
        trajectory: Trajectory,
    },
    Delivery {
        pickup_waypoint: usize,
        pickup_wait: Duration,
        dropoff_waypoint: usize,
        dropoff_wait: Duration,
    },
    Loop {
        start_waypoint: usize,
        finish_waypoint: usize,
        num_loops: u32,
    },
    /// Self-generated by fleets in response to planner output; never minted
    /// by the dispatcher.
    ChargeBattery {
        charging_waypoint: usize,
    },
}

impl TaskRequest {
    pub fn is_charging(&self) -> bool {
        matches!(self.detail, RequestDetail::ChargeBattery { .. })
    }

    /// The waypoint where a robot begins working on this request.
    pub fn start_waypoint(&self) -> usize {
        match &self.detail {
            RequestDetail::Clean { start_waypoint, .. } => *start_waypoint,
            RequestDetail::Delivery {
                pickup_waypoint, ..
            } => *pickup_waypoint,
            RequestDetail::Loop { start_waypoint, .. } => *start_waypoint,
            RequestDetail::ChargeBattery { charging_waypoint } => *charging_waypoint,
        }
    }

    /// The waypoint where a robot ends up after completing this request.
    pub fn finish_waypoint(&self) -> usize {
        match &self.detail {
            RequestDetail::Clean {
                finish_waypoint, ..
            } => *finish_waypoint,
            RequestDetail::Delivery {
                dropoff_waypoint, ..
            } => *dropoff_waypoint,
            RequestDetail::Loop {
                finish_waypoint, ..
            } => *finish_waypoint,
            RequestDetail::ChargeBattery { charging_waypoint } => *charging_waypoint,
        }
    }
}
