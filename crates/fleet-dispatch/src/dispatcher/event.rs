use fleet_server::actor::ActorHandle;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::bidding::{BidProposal, Evaluator};
use crate::error::DispatchResult;
use crate::fleet::FleetActor;
use crate::id::TaskId;
use crate::messages::DispatchAck;
use crate::task::{TaskDescription, TaskState, TaskStatus, TaskSummary};

pub type StatusCallback = Box<dyn Fn(&TaskStatus) + Send>;

/// The result of the task list query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    pub active_tasks: Vec<TaskSummary>,
    pub terminated_tasks: Vec<TaskSummary>,
}

pub enum DispatcherEvent {
    SubmitTask {
        description: TaskDescription,
        result: oneshot::Sender<DispatchResult<TaskId>>,
    },
    CancelTask {
        task_id: TaskId,
        result: oneshot::Sender<bool>,
    },
    GetTaskState {
        task_id: TaskId,
        result: oneshot::Sender<Option<TaskState>>,
    },
    GetTaskList {
        result: oneshot::Sender<TaskList>,
    },
    RegisterFleet {
        fleet_name: String,
        fleet: ActorHandle<FleetActor>,
    },
    /// A proposal published by a fleet during an auction window.
    ReceiveProposal {
        proposal: BidProposal,
    },
    /// The window timer for an auction has fired.
    BiddingWindowClosed {
        task_id: TaskId,
    },
    /// A fleet acknowledged a dispatch request.
    ReceiveDispatchAck {
        ack: DispatchAck,
    },
    /// A fleet reported the status of a task. Unknown task IDs are admitted
    /// to the active table as stray tasks.
    UpdateTaskStatus {
        status: TaskStatus,
    },
    PublishOngoingTasks,
    SetEvaluator {
        evaluator: Box<dyn Evaluator>,
    },
    SetStatusCallback {
        callback: StatusCallback,
    },
    Shutdown,
}
