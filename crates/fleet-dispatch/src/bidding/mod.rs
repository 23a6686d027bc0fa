mod auctioneer;
mod evaluator;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use auctioneer::Auctioneer;
pub use evaluator::{
    Evaluator, LeastFleetCostEvaluator, LeastFleetDiffCostEvaluator, QuickestFinishEvaluator,
};

use crate::task::TaskProfile;

/// The announcement of a task up for bidding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidNotice {
    pub task_profile: TaskProfile,
    /// The length of the auction window.
    pub time_window: Duration,
}

/// A fleet's offer to execute a task. The cost pair lets the evaluator
/// compare the marginal impact of accepting the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidProposal {
    pub fleet_name: String,
    pub task_profile: TaskProfile,
    pub robot_name: String,
    pub prev_cost: f64,
    pub new_cost: f64,
    pub finish_time: DateTime<Utc>,
}
