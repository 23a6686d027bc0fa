mod actor;
mod event;
mod options;

use std::sync::Arc;

use fleet_common::config::AppConfig;
use fleet_server::actor::ActorHandle;
use tokio::sync::{broadcast, oneshot};

pub use actor::FleetActor;
pub use event::{AcceptTaskRequest, FleetEvent};
pub use options::FleetOptions;

use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, DispatchResult};
use crate::graph::{NavGraph, VehicleTraits};
use crate::id::TaskId;
use crate::messages::{DockSummary, FleetState};
use crate::planner::{TaskPlanner, TaskPlannerParams};
use crate::task::{TaskProfile, TaskState};
use crate::task_manager::TaskManager;

const FLEET_STATE_TOPIC_SIZE: usize = 16;

/// The owning handle of a fleet's bidder/allocator. Robot registration and
/// planner configuration are serialized through the fleet's event loop so
/// they never race against bid handling.
pub struct Fleet {
    name: String,
    handle: ActorHandle<FleetActor>,
    fleet_state: broadcast::Sender<FleetState>,
}

impl Fleet {
    pub fn new(
        name: impl Into<String>,
        graph: NavGraph,
        vehicle_traits: VehicleTraits,
        config: &AppConfig,
        dispatcher: &Dispatcher,
    ) -> Self {
        let name = name.into();
        let (sender, _) = broadcast::channel(FLEET_STATE_TOPIC_SIZE);
        let options = FleetOptions::new(
            name.clone(),
            graph,
            vehicle_traits,
            &config.fleet,
            dispatcher.handle().clone(),
            sender.clone(),
        );
        let handle = ActorHandle::new(options);
        Self {
            name,
            handle,
            fleet_state: sender,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &ActorHandle<FleetActor> {
        &self.handle
    }

    /// Add a robot to the fleet. The start waypoints must be non-empty and
    /// the navigation graph must contain a charging waypoint, which is
    /// assigned to the robot by nearest ideal path cost.
    pub async fn add_robot(
        &self,
        manager: Box<dyn TaskManager>,
        start_waypoints: Vec<usize>,
    ) -> DispatchResult<()> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(FleetEvent::AddRobot {
                manager,
                start_waypoints,
                result: tx,
            })
            .await
            .map_err(|_| stopped(&self.name))?;
        rx.await.map_err(|_| stopped(&self.name))?
    }

    /// Define the predicate used to accept or reject bid notices.
    pub async fn accept_task_requests(
        &self,
        accept: impl Fn(&TaskProfile) -> bool + Send + 'static,
    ) -> DispatchResult<()> {
        self.handle
            .send(FleetEvent::AcceptTaskRequests {
                accept: Box::new(accept),
            })
            .await
            .map_err(|_| stopped(&self.name))
    }

    /// Configure the task planner. Returns false when the planner params are
    /// invalid, in which case the previous planner is kept.
    pub async fn set_task_planner(
        &self,
        planner: Arc<dyn TaskPlanner>,
        params: TaskPlannerParams,
    ) -> DispatchResult<bool> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(FleetEvent::ConfigurePlanner {
                planner,
                params,
                result: tx,
            })
            .await
            .map_err(|_| stopped(&self.name))?;
        rx.await.map_err(|_| stopped(&self.name))
    }

    /// Update the cleaning dock parameters from a dock summary.
    pub async fn update_docks(&self, summary: DockSummary) -> DispatchResult<()> {
        self.handle
            .send(FleetEvent::DockSummary { summary })
            .await
            .map_err(|_| stopped(&self.name))
    }

    pub async fn close_lanes(&self, lanes: Vec<usize>) -> DispatchResult<()> {
        self.handle
            .send(FleetEvent::CloseLanes { lanes })
            .await
            .map_err(|_| stopped(&self.name))
    }

    pub async fn open_lanes(&self, lanes: Vec<usize>) -> DispatchResult<()> {
        self.handle
            .send(FleetEvent::OpenLanes { lanes })
            .await
            .map_err(|_| stopped(&self.name))
    }

    /// Report a task state transition observed by the execution layer. The
    /// report is forwarded to the dispatcher's status channel.
    pub async fn report_task_status(
        &self,
        task_id: TaskId,
        robot_name: impl Into<String>,
        state: TaskState,
    ) -> DispatchResult<()> {
        self.handle
            .send(FleetEvent::ReportTaskStatus {
                task_id,
                robot_name: robot_name.into(),
                state,
            })
            .await
            .map_err(|_| stopped(&self.name))
    }

    pub fn subscribe_fleet_state(&self) -> broadcast::Receiver<FleetState> {
        self.fleet_state.subscribe()
    }
}

fn stopped(name: &str) -> DispatchError {
    DispatchError::InternalError(format!("fleet [{name}] is not running"))
}
