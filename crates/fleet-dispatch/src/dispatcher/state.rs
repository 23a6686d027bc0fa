use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use log::warn;

use crate::bidding::BidNotice;
use crate::error::DispatchResult;
use crate::id::{TaskId, TaskIdGenerator};
use crate::task::{TaskKind, TaskState, TaskStatus, TaskSummary};

/// The dispatcher's task bookkeeping. Every task ID appears in at most one
/// of the two tables at any instant, and a task enters the terminated table
/// only in a terminal state, never to leave it.
pub struct DispatcherState {
    active: IndexMap<TaskId, TaskStatus>,
    terminated: IndexMap<TaskId, TaskStatus>,
    /// The IDs of ongoing user-submitted tasks. Active tasks outside this
    /// set were generated by fleets (e.g. charging).
    user_submitted: HashSet<TaskId>,
    bid_queue: VecDeque<BidNotice>,
    id_generator: TaskIdGenerator,
    terminated_tasks_max_size: usize,
}

impl DispatcherState {
    pub fn new(terminated_tasks_max_size: usize) -> Self {
        Self {
            active: IndexMap::new(),
            terminated: IndexMap::new(),
            user_submitted: HashSet::new(),
            bid_queue: VecDeque::new(),
            id_generator: TaskIdGenerator::new(),
            terminated_tasks_max_size,
        }
    }

    pub fn mint_task_id(&mut self, kind: TaskKind) -> DispatchResult<TaskId> {
        self.id_generator.next(kind)
    }

    /// Record a fresh user submission in the active table.
    pub fn insert_submitted(&mut self, status: TaskStatus) {
        let task_id = status.task_id().clone();
        self.user_submitted.insert(task_id.clone());
        self.active.insert(task_id, status);
    }

    /// Admit a task the dispatcher has never heard of, reported by a fleet
    /// outside the auction path.
    pub fn admit_stray(&mut self, status: TaskStatus) {
        self.active.insert(status.task_id().clone(), status);
    }

    pub fn get_active(&self, task_id: &TaskId) -> Option<&TaskStatus> {
        self.active.get(task_id)
    }

    pub fn get_active_mut(&mut self, task_id: &TaskId) -> Option<&mut TaskStatus> {
        self.active.get_mut(task_id)
    }

    pub fn contains_active(&self, task_id: &TaskId) -> bool {
        self.active.contains_key(task_id)
    }

    pub fn contains_terminated(&self, task_id: &TaskId) -> bool {
        self.terminated.contains_key(task_id)
    }

    pub fn is_user_submitted(&self, task_id: &TaskId) -> bool {
        self.user_submitted.contains(task_id)
    }

    /// Replace the active record of a task, keeping its table position.
    pub fn update_active(&mut self, status: TaskStatus) {
        self.active.insert(status.task_id().clone(), status);
    }

    pub fn get_state(&self, task_id: &TaskId) -> Option<TaskState> {
        self.active
            .get(task_id)
            .or_else(|| self.terminated.get(task_id))
            .map(|status| status.state)
    }

    pub fn active_summaries(&self) -> Vec<TaskSummary> {
        self.active.values().map(TaskSummary::from).collect()
    }

    pub fn terminated_summaries(&self) -> Vec<TaskSummary> {
        self.terminated.values().map(TaskSummary::from).collect()
    }

    /// Push a bid notice onto the auction queue. Returns true when the
    /// queue was empty, i.e. the caller should start the next auction.
    pub fn push_notice(&mut self, notice: BidNotice) -> bool {
        self.bid_queue.push_back(notice);
        self.bid_queue.len() == 1
    }

    pub fn front_notice(&self) -> Option<&BidNotice> {
        self.bid_queue.front()
    }

    pub fn pop_notice(&mut self) -> Option<BidNotice> {
        self.bid_queue.pop_front()
    }

    /// Move a task into the terminated table, evicting the entry with the
    /// earliest submission time when the table is full.
    pub fn terminate(&mut self, status: TaskStatus) {
        debug_assert!(status.is_terminated());
        if self.terminated.len() >= self.terminated_tasks_max_size {
            warn!("terminated tasks reached max size, removing the earliest submitted task");
            let evict = self
                .terminated
                .values()
                .min_by_key(|s| s.task_profile.submission_time)
                .map(|s| s.task_id().clone());
            if let Some(task_id) = evict {
                self.terminated.shift_remove(&task_id);
            }
        }
        let task_id = status.task_id().clone();
        self.terminated.insert(task_id.clone(), status);
        self.user_submitted.remove(&task_id);
        self.active.shift_remove(&task_id);
    }

    /// Mark as canceled every active task attributed to a fleet that was
    /// not submitted by a user, and return copies for termination. Fleets
    /// regenerate such auxiliary work after reassignment, so keeping the
    /// stale records would duplicate it.
    pub fn cancel_self_generated(&mut self, fleet_name: &str) -> Vec<TaskStatus> {
        let task_ids: Vec<TaskId> = self
            .active
            .iter()
            .filter(|(task_id, status)| {
                status.fleet_name.as_deref() == Some(fleet_name)
                    && !self.user_submitted.contains(*task_id)
            })
            .map(|(task_id, _)| task_id.clone())
            .collect();
        task_ids
            .into_iter()
            .filter_map(|task_id| {
                self.active.get_mut(&task_id).map(|status| {
                    status.state = TaskState::Canceled;
                    status.clone()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::task::{TaskDescription, TaskProfile};

    fn status(id: &str, submitted_secs_ago: i64) -> TaskStatus {
        TaskStatus::new(TaskProfile {
            task_id: TaskId::from(id),
            submission_time: Utc::now() - Duration::seconds(submitted_secs_ago),
            description: TaskDescription::loop_between("A", "B", 1),
        })
    }

    fn terminal(id: &str, submitted_secs_ago: i64) -> TaskStatus {
        let mut status = status(id, submitted_secs_ago);
        status.state = TaskState::Failed;
        status
    }

    #[test]
    fn test_tables_stay_disjoint() {
        let mut state = DispatcherState::new(10);
        state.insert_submitted(status("Loop0", 0));
        assert!(state.contains_active(&TaskId::from("Loop0")));
        assert!(state.is_user_submitted(&TaskId::from("Loop0")));

        state.terminate(terminal("Loop0", 0));
        assert!(!state.contains_active(&TaskId::from("Loop0")));
        assert!(!state.is_user_submitted(&TaskId::from("Loop0")));
        assert!(state.contains_terminated(&TaskId::from("Loop0")));
        assert_eq!(
            state.get_state(&TaskId::from("Loop0")),
            Some(TaskState::Failed)
        );
    }

    #[test]
    fn test_eviction_in_submission_time_order() {
        let mut state = DispatcherState::new(3);
        // t1 was submitted earliest, t4 latest.
        state.terminate(terminal("t1", 40));
        state.terminate(terminal("t2", 30));
        state.terminate(terminal("t3", 20));
        state.terminate(terminal("t4", 10));
        let remaining: Vec<_> = state
            .terminated_summaries()
            .iter()
            .map(|s| s.task_id.as_str().to_string())
            .collect();
        assert_eq!(remaining, vec!["t2", "t3", "t4"]);
    }

    #[test]
    fn test_sweep_self_generated() {
        let mut state = DispatcherState::new(10);
        let mut user = status("Delivery0", 0);
        user.fleet_name = Some("f1".to_string());
        state.insert_submitted(user);

        let mut charge = status("ChargeBattery0", 0);
        charge.fleet_name = Some("f1".to_string());
        charge.state = TaskState::Queued;
        state.admit_stray(charge);

        let mut other = status("ChargeBattery1", 0);
        other.fleet_name = Some("f2".to_string());
        state.admit_stray(other);

        let swept = state.cancel_self_generated("f1");
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].task_id().as_str(), "ChargeBattery0");
        assert_eq!(swept[0].state, TaskState::Canceled);
        // The user-submitted task and the other fleet's task are untouched.
        assert_eq!(
            state.get_state(&TaskId::from("Delivery0")),
            Some(TaskState::Pending)
        );
        assert_eq!(
            state.get_state(&TaskId::from("ChargeBattery1")),
            Some(TaskState::Pending)
        );

        // Terminating the swept copies moves them out of the active table.
        for status in swept {
            state.terminate(status);
        }
        assert!(!state.contains_active(&TaskId::from("ChargeBattery0")));
        assert!(state.contains_terminated(&TaskId::from("ChargeBattery0")));
    }

    #[test]
    fn test_bid_queue_fifo() {
        let mut state = DispatcherState::new(10);
        let notice = |id: &str| BidNotice {
            task_profile: status(id, 0).task_profile,
            time_window: std::time::Duration::from_secs(2),
        };
        assert!(state.push_notice(notice("Loop0")));
        assert!(!state.push_notice(notice("Loop1")));
        assert_eq!(
            state.front_notice().map(|n| n.task_profile.task_id.clone()),
            Some(TaskId::from("Loop0"))
        );
        assert_eq!(
            state.pop_notice().map(|n| n.task_profile.task_id),
            Some(TaskId::from("Loop0"))
        );
        assert_eq!(
            state.pop_notice().map(|n| n.task_profile.task_id),
            Some(TaskId::from("Loop1"))
        );
        assert!(state.pop_notice().is_none());
    }
}
