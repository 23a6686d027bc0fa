use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::graph::{NavGraph, VehicleTraits};
use crate::request::{BinaryPriority, RequestDetail, TaskRequest};

/// The projected configuration of a robot after completing its current
/// queue, used as planning input.
#[derive(Debug, Clone, Copy)]
pub struct RobotState {
    /// The time at which the robot reaches this state.
    pub time: DateTime<Utc>,
    pub waypoint: usize,
    pub charging_waypoint: usize,
    /// The state of charge, in the `[0.0, 1.0]` range.
    pub battery_soc: f64,
}

/// One entry of a robot's planned queue.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub request: Arc<TaskRequest>,
    pub deployment_time: DateTime<Utc>,
    /// The projected state after completing the request; it feeds the next
    /// entry's start state.
    pub finish_state: RobotState,
}

/// One queue per robot, in robot registration order.
pub type Assignments = Vec<Vec<Assignment>>;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum TaskPlannerError {
    /// The initial charge is insufficient for any robot.
    #[error("insufficient initial battery charge for all robots in this fleet")]
    LowBattery,
    /// The battery capacity cannot accommodate one or more requests.
    #[error("insufficient battery capacity to accommodate one or more requests")]
    LimitedCapacity,
    #[error("no assignments could be computed")]
    Empty,
}

/// The multi-robot task planner. The core treats it as a pure function
/// invoked synchronously; any parallelism must reside inside the planner.
pub trait TaskPlanner: Send + Sync {
    fn plan(
        &self,
        now: DateTime<Utc>,
        states: Vec<RobotState>,
        requests: Vec<Arc<TaskRequest>>,
    ) -> Result<Assignments, TaskPlannerError>;

    fn compute_cost(&self, assignments: &Assignments) -> f64;
}

/// The battery-related planner configuration supplied alongside a planner.
/// Thresholds are states of charge in the `[0.0, 1.0]` range.
#[derive(Debug, Clone, Copy)]
pub struct TaskPlannerParams {
    pub recharge_threshold: f64,
    pub recharge_soc: f64,
    pub account_for_battery_drain: bool,
}

impl TaskPlannerParams {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.recharge_threshold) && (0.0..=1.0).contains(&self.recharge_soc)
    }
}

impl Default for TaskPlannerParams {
    fn default() -> Self {
        Self {
            recharge_threshold: 0.1,
            recharge_soc: 1.0,
            account_for_battery_drain: true,
        }
    }
}

const LOW_BATTERY_THRESHOLD: f64 = 0.02;
const DRAIN_RATE_PER_SECOND: f64 = 0.00005;
const CHARGE_SECONDS: f64 = 1800.0;

/// A naive cost-minimizing planner: requests are ordered by priority and
/// earliest start time, and each is appended to the queue of the robot that
/// would finish it soonest. It is a reference implementation for wiring and
/// tests; production deployments inject their own planner.
pub struct GreedyPlanner {
    graph: Arc<NavGraph>,
    traits: VehicleTraits,
}

impl GreedyPlanner {
    pub fn new(graph: Arc<NavGraph>, traits: VehicleTraits) -> Self {
        Self { graph, traits }
    }

    fn travel_seconds(&self, from: usize, to: usize) -> f64 {
        let meters = self.graph.ideal_cost(from, to).unwrap_or(0.0);
        meters / self.traits.linear_velocity
    }

    fn work_seconds(&self, state: &RobotState, request: &TaskRequest) -> f64 {
        match &request.detail {
            RequestDetail::Clean { trajectory, .. } => {
                let motion = trajectory
                    .points()
                    .first()
                    .zip(trajectory.points().last())
                    .map(|(a, b)| (b.time - a.time).num_milliseconds() as f64 / 1e3)
                    .unwrap_or(0.0);
                motion.max(60.0)
            }
            RequestDetail::Delivery {
                pickup_waypoint,
                pickup_wait,
                dropoff_waypoint,
                dropoff_wait,
            } => {
                self.travel_seconds(*pickup_waypoint, *dropoff_waypoint)
                    + pickup_wait.as_secs_f64()
                    + dropoff_wait.as_secs_f64()
            }
            RequestDetail::Loop {
                start_waypoint,
                finish_waypoint,
                num_loops,
            } => {
                let leg = self.travel_seconds(*start_waypoint, *finish_waypoint);
                leg * (2 * num_loops) as f64
            }
            RequestDetail::ChargeBattery { .. } => (1.0 - state.battery_soc) * CHARGE_SECONDS,
        }
    }
}

impl TaskPlanner for GreedyPlanner {
    fn plan(
        &self,
        now: DateTime<Utc>,
        states: Vec<RobotState>,
        requests: Vec<Arc<TaskRequest>>,
    ) -> Result<Assignments, TaskPlannerError> {
        if states.is_empty() {
            return Err(TaskPlannerError::Empty);
        }
        if states
            .iter()
            .all(|state| state.battery_soc <= LOW_BATTERY_THRESHOLD)
        {
            return Err(TaskPlannerError::LowBattery);
        }

        let mut requests = requests;
        let rank = |r: &Arc<TaskRequest>| match r.priority {
            BinaryPriority::High => 0,
            BinaryPriority::Low => 1,
        };
        requests.sort_by(|a, b| {
            rank(a)
                .cmp(&rank(b))
                .then(a.earliest_start_time.cmp(&b.earliest_start_time))
        });

        let mut current = states;
        let mut assignments: Assignments = vec![vec![]; current.len()];
        for request in requests {
            let mut best: Option<(usize, DateTime<Utc>, RobotState)> = None;
            for (index, state) in current.iter().enumerate() {
                let deployment = now.max(state.time).max(request.earliest_start_time);
                let travel = self.travel_seconds(state.waypoint, request.start_waypoint());
                let seconds = travel + self.work_seconds(state, &request);
                let soc = if request.is_charging() {
                    1.0
                } else {
                    state.battery_soc - seconds * DRAIN_RATE_PER_SECOND
                };
                if soc < 0.0 {
                    continue;
                }
                let finish = RobotState {
                    time: deployment + Duration::milliseconds((seconds * 1e3) as i64),
                    waypoint: request.finish_waypoint(),
                    charging_waypoint: state.charging_waypoint,
                    battery_soc: soc,
                };
                let better = match &best {
                    Some((_, _, s)) => finish.time < s.time,
                    None => true,
                };
                if better {
                    best = Some((index, deployment, finish));
                }
            }
            let Some((index, deployment, finish)) = best else {
                return Err(TaskPlannerError::LimitedCapacity);
            };
            assignments[index].push(Assignment {
                request,
                deployment_time: deployment,
                finish_state: finish,
            });
            current[index] = finish;
        }
        Ok(assignments)
    }

    fn compute_cost(&self, assignments: &Assignments) -> f64 {
        assignments
            .iter()
            .flatten()
            .map(|a| (a.finish_state.time - a.deployment_time).num_milliseconds() as f64 / 1e3)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;

    fn test_graph() -> Arc<NavGraph> {
        let mut graph = NavGraph::new();
        graph.add_waypoint("A", [0.0, 0.0]);
        graph.add_waypoint("B", [10.0, 0.0]);
        graph.add_charger("charger", [5.0, 0.0]);
        Arc::new(graph)
    }

    fn robot(waypoint: usize, soc: f64) -> RobotState {
        RobotState {
            time: Utc::now(),
            waypoint,
            charging_waypoint: 2,
            battery_soc: soc,
        }
    }

    fn loop_request(id: &str) -> Arc<TaskRequest> {
        Arc::new(TaskRequest {
            id: TaskId::from(id),
            earliest_start_time: Utc::now(),
            priority: BinaryPriority::Low,
            detail: RequestDetail::Loop {
                start_waypoint: 0,
                finish_waypoint: 1,
                num_loops: 1,
            },
        })
    }

    #[test]
    fn test_greedy_assignment() {
        let planner = GreedyPlanner::new(test_graph(), VehicleTraits::default());
        let states = vec![robot(0, 1.0), robot(1, 1.0)];
        let assignments = planner
            .plan(Utc::now(), states, vec![loop_request("Loop0")])
            .unwrap();
        assert_eq!(assignments.len(), 2);
        // The robot already at the loop start finishes sooner.
        assert_eq!(assignments[0].len(), 1);
        assert!(assignments[1].is_empty());
        assert!(planner.compute_cost(&assignments) > 0.0);
    }

    #[test]
    fn test_no_robots() {
        let planner = GreedyPlanner::new(test_graph(), VehicleTraits::default());
        let result = planner.plan(Utc::now(), vec![], vec![loop_request("Loop0")]);
        assert_eq!(result.unwrap_err(), TaskPlannerError::Empty);
    }

    #[test]
    fn test_low_battery() {
        let planner = GreedyPlanner::new(test_graph(), VehicleTraits::default());
        let states = vec![robot(0, 0.01), robot(1, 0.0)];
        let result = planner.plan(Utc::now(), states, vec![loop_request("Loop0")]);
        assert_eq!(result.unwrap_err(), TaskPlannerError::LowBattery);
    }

    #[test]
    fn test_empty_request_set_yields_empty_queues() {
        let planner = GreedyPlanner::new(test_graph(), VehicleTraits::default());
        let assignments = planner.plan(Utc::now(), vec![robot(0, 1.0)], vec![]).unwrap();
        assert_eq!(assignments.len(), 1);
        assert!(assignments[0].is_empty());
    }
}
