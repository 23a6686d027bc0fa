mod allocator;
mod core;
mod handler;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::fleet::event::AcceptTaskRequest;
use crate::fleet::FleetOptions;
use crate::graph::{DockParameters, NavGraph};
use crate::id::TaskId;
use crate::planner::{Assignments, TaskPlanner};
use crate::request::TaskRequest;
use crate::task::TaskProfile;
use crate::task_manager::TaskManager;

pub struct FleetActor {
    options: FleetOptions,
    graph: NavGraph,
    /// Cleaning dock parameters, keyed by dock start waypoint name.
    dock_params: HashMap<String, DockParameters>,
    accept_task: Option<AcceptTaskRequest>,
    task_planner: Option<Arc<dyn TaskPlanner>>,
    /// The per-robot execution queues, in registration order. Assignment
    /// matrix rows follow this order.
    task_managers: Vec<Box<dyn TaskManager>>,
    /// The assignment computed for each bid, kept for the lifetime of the
    /// task so a notice for the same ID is never bid on again.
    bid_notice_assignments: HashMap<TaskId, Assignments>,
    generated_requests: HashMap<TaskId, Arc<TaskRequest>>,
    task_profiles: HashMap<TaskId, TaskProfile>,
    assigned_requests: HashMap<TaskId, Arc<TaskRequest>>,
    cancelled_task_ids: HashSet<TaskId>,
    current_assignment_cost: f64,
}
