use std::sync::Arc;

use tokio::sync::oneshot;

use crate::bidding::BidNotice;
use crate::error::DispatchResult;
use crate::id::TaskId;
use crate::messages::{DispatchAck, DispatchRequest, DockSummary};
use crate::planner::{TaskPlanner, TaskPlannerParams};
use crate::task::{TaskProfile, TaskState};
use crate::task_manager::TaskManager;

pub type AcceptTaskRequest = Box<dyn Fn(&TaskProfile) -> bool + Send>;

pub enum FleetEvent {
    /// A task is up for bidding.
    BidNotice {
        notice: BidNotice,
    },
    /// The dispatcher commands the fleet to commit or revoke a task.
    DispatchRequest {
        request: DispatchRequest,
        result: oneshot::Sender<DispatchAck>,
    },
    DockSummary {
        summary: DockSummary,
    },
    AddRobot {
        manager: Box<dyn TaskManager>,
        start_waypoints: Vec<usize>,
        result: oneshot::Sender<DispatchResult<()>>,
    },
    CloseLanes {
        lanes: Vec<usize>,
    },
    OpenLanes {
        lanes: Vec<usize>,
    },
    AcceptTaskRequests {
        accept: AcceptTaskRequest,
    },
    ConfigurePlanner {
        planner: Arc<dyn TaskPlanner>,
        params: TaskPlannerParams,
        result: oneshot::Sender<bool>,
    },
    /// The execution layer observed a task state transition.
    ReportTaskStatus {
        task_id: TaskId,
        robot_name: String,
        state: TaskState,
    },
    PublishFleetState,
}
