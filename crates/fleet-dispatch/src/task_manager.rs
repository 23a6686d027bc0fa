use std::sync::{Arc, Mutex, MutexGuard};

use crate::id::TaskId;
use crate::messages::RobotSummary;
use crate::planner::{Assignment, RobotState};
use crate::request::TaskRequest;

/// The per-robot execution queue endpoint. The robot execution layer lives
/// outside the core; the core only sets queues, revokes queued work through
/// replanning, and reads back what has been executed.
pub trait TaskManager: Send {
    fn robot_name(&self) -> String;

    /// Assign the charging waypoint chosen for this robot at registration.
    fn assign_charger(&mut self, waypoint: usize);

    /// The projected state after completing the current queue.
    fn expected_finish_state(&self) -> RobotState;

    /// The queued requests that have not begun execution, excluding
    /// self-generated charging requests.
    fn pending_requests(&self) -> Vec<Arc<TaskRequest>>;

    /// Replace the robot's queue with a new plan row.
    fn set_queue(&mut self, queue: Vec<Assignment>);

    /// The tasks this robot has already begun or finished executing.
    fn executed_tasks(&self) -> Vec<TaskId>;

    fn summary(&self) -> RobotSummary;
}

/// A queue-holding [TaskManager] with no robot behind it, used by the demo
/// binary and tests. Clones share state so a queue committed through the
/// fleet is observable from outside the actor.
#[derive(Clone)]
pub struct InMemoryTaskManager {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    name: String,
    state: RobotState,
    queue: Vec<Assignment>,
    executed: Vec<TaskId>,
    current_task: Option<TaskId>,
}

impl InMemoryTaskManager {
    pub fn new(name: impl Into<String>, state: RobotState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                name: name.into(),
                state,
                queue: vec![],
                executed: vec![],
                current_task: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mark the head of the queue as started, as the robot would when it
    /// begins executing. Returns the started task, if any.
    pub fn start_next_task(&self) -> Option<TaskId> {
        let mut inner = self.lock();
        if inner.queue.is_empty() {
            return None;
        }
        let assignment = inner.queue.remove(0);
        let task_id = assignment.request.id.clone();
        inner.state = assignment.finish_state;
        inner.executed.push(task_id.clone());
        inner.current_task = Some(task_id.clone());
        Some(task_id)
    }

    /// Mark the current task as finished.
    pub fn finish_current_task(&self) {
        self.lock().current_task = None;
    }

    pub fn queued_tasks(&self) -> Vec<TaskId> {
        self.lock()
            .queue
            .iter()
            .map(|a| a.request.id.clone())
            .collect()
    }
}

impl TaskManager for InMemoryTaskManager {
    fn robot_name(&self) -> String {
        self.lock().name.clone()
    }

    fn assign_charger(&mut self, waypoint: usize) {
        self.lock().state.charging_waypoint = waypoint;
    }

    fn expected_finish_state(&self) -> RobotState {
        let inner = self.lock();
        inner
            .queue
            .last()
            .map(|a| a.finish_state)
            .unwrap_or(inner.state)
    }

    fn pending_requests(&self) -> Vec<Arc<TaskRequest>> {
        self.lock()
            .queue
            .iter()
            .map(|a| a.request.clone())
            .filter(|r| !r.is_charging())
            .collect()
    }

    fn set_queue(&mut self, queue: Vec<Assignment>) {
        self.lock().queue = queue;
    }

    fn executed_tasks(&self) -> Vec<TaskId> {
        self.lock().executed.clone()
    }

    fn summary(&self) -> RobotSummary {
        let inner = self.lock();
        RobotSummary {
            name: inner.name.clone(),
            battery_percent: inner.state.battery_soc * 100.0,
            task_id: inner.current_task.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::request::{BinaryPriority, RequestDetail};

    fn state(waypoint: usize) -> RobotState {
        RobotState {
            time: Utc::now(),
            waypoint,
            charging_waypoint: 0,
            battery_soc: 1.0,
        }
    }

    fn assignment(id: &str) -> Assignment {
        Assignment {
            request: Arc::new(TaskRequest {
                id: TaskId::from(id),
                earliest_start_time: Utc::now(),
                priority: BinaryPriority::Low,
                detail: RequestDetail::Loop {
                    start_waypoint: 0,
                    finish_waypoint: 1,
                    num_loops: 1,
                },
            }),
            deployment_time: Utc::now(),
            finish_state: state(1),
        }
    }

    fn charging_assignment(id: &str) -> Assignment {
        Assignment {
            request: Arc::new(TaskRequest {
                id: TaskId::from(id),
                earliest_start_time: Utc::now(),
                priority: BinaryPriority::Low,
                detail: RequestDetail::ChargeBattery {
                    charging_waypoint: 0,
                },
            }),
            deployment_time: Utc::now(),
            finish_state: state(0),
        }
    }

    #[test]
    fn test_queue_and_execution() {
        let mut manager = InMemoryTaskManager::new("robot_1", state(0));
        manager.set_queue(vec![assignment("Loop0"), charging_assignment("Charge0")]);

        // Charging requests are invisible to the allocator's pending set.
        let pending = manager.pending_requests();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "Loop0");

        assert!(manager.executed_tasks().is_empty());
        assert_eq!(manager.start_next_task().unwrap().as_str(), "Loop0");
        assert_eq!(manager.executed_tasks(), vec![TaskId::from("Loop0")]);
        assert_eq!(manager.summary().task_id, Some(TaskId::from("Loop0")));

        manager.finish_current_task();
        assert_eq!(manager.summary().task_id, None);
    }

    #[test]
    fn test_expected_finish_state_follows_queue() {
        let mut manager = InMemoryTaskManager::new("robot_1", state(0));
        assert_eq!(manager.expected_finish_state().waypoint, 0);
        manager.set_queue(vec![assignment("Loop0")]);
        assert_eq!(manager.expected_finish_state().waypoint, 1);
    }
}
