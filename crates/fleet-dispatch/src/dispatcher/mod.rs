mod actor;
mod event;
mod options;
mod registry;
mod state;

use fleet_common::config::AppConfig;
use fleet_server::actor::ActorHandle;
use tokio::sync::{broadcast, oneshot};

pub use actor::DispatcherActor;
pub use event::{DispatcherEvent, StatusCallback, TaskList};
pub use options::DispatcherOptions;

use crate::bidding::Evaluator;
use crate::error::{DispatchError, DispatchResult};
use crate::fleet::Fleet;
use crate::id::TaskId;
use crate::task::{TaskDescription, TaskState, TaskStatus, TaskSummary};

const ONGOING_TASKS_TOPIC_SIZE: usize = 16;

/// The owning handle of the dispatcher. All operations are serialized
/// through the dispatcher's event loop, so submissions are handled in FIFO
/// order and auctions run one at a time.
pub struct Dispatcher {
    handle: ActorHandle<DispatcherActor>,
    ongoing_tasks: broadcast::Sender<Vec<TaskSummary>>,
}

impl Dispatcher {
    pub fn new(config: &AppConfig) -> Self {
        let (sender, _) = broadcast::channel(ONGOING_TASKS_TOPIC_SIZE);
        let options = DispatcherOptions::new(&config.dispatch, sender.clone());
        let handle = ActorHandle::new(options);
        Self {
            handle,
            ongoing_tasks: sender,
        }
    }

    pub fn handle(&self) -> &ActorHandle<DispatcherActor> {
        &self.handle
    }

    /// Submit a task for dispatch. Returns the minted task ID, or an error
    /// when the task type tag is not recognized.
    pub async fn submit_task(&self, description: TaskDescription) -> DispatchResult<TaskId> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(DispatcherEvent::SubmitTask {
                description,
                result: tx,
            })
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())?
    }

    /// Cancel a task. Returns true when the task was canceled locally
    /// (pending) or the owning fleet acknowledged the cancellation (queued).
    pub async fn cancel_task(&self, task_id: TaskId) -> DispatchResult<bool> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(DispatcherEvent::CancelTask {
                task_id,
                result: tx,
            })
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    /// Look up the state of a task, in the active table first and then the
    /// terminated table.
    pub async fn get_task_state(&self, task_id: TaskId) -> DispatchResult<Option<TaskState>> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(DispatcherEvent::GetTaskState {
                task_id,
                result: tx,
            })
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn task_list(&self) -> DispatchResult<TaskList> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(DispatcherEvent::GetTaskList { result: tx })
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    /// Register the single task status observer. The callback is invoked
    /// synchronously from within state transitions and must not re-enter the
    /// dispatcher's own operations.
    pub async fn on_change(
        &self,
        callback: impl Fn(&TaskStatus) + Send + 'static,
    ) -> DispatchResult<()> {
        self.handle
            .send(DispatcherEvent::SetStatusCallback {
                callback: Box::new(callback),
            })
            .await
            .map_err(|_| stopped())
    }

    /// Inject the auctioneer's winner-selection policy.
    pub async fn set_evaluator(&self, evaluator: Box<dyn Evaluator>) -> DispatchResult<()> {
        self.handle
            .send(DispatcherEvent::SetEvaluator { evaluator })
            .await
            .map_err(|_| stopped())
    }

    /// Register a fleet as an auction participant and dispatch target.
    pub async fn register_fleet(&self, fleet: &Fleet) -> DispatchResult<()> {
        self.handle
            .send(DispatcherEvent::RegisterFleet {
                fleet_name: fleet.name().to_string(),
                fleet: fleet.handle().clone(),
            })
            .await
            .map_err(|_| stopped())
    }

    pub fn subscribe_ongoing_tasks(&self) -> broadcast::Receiver<Vec<TaskSummary>> {
        self.ongoing_tasks.subscribe()
    }

    pub async fn shutdown(&self) {
        if self.handle.send(DispatcherEvent::Shutdown).await.is_ok() {
            self.handle.clone().wait_for_stop().await;
        }
    }
}

fn stopped() -> DispatchError {
    DispatchError::InternalError("the dispatcher is not running".to_string())
}
