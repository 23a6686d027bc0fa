use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// The recognized task kinds. Submissions carry a raw numeric tag which is
/// resolved through [TaskKind::from_tag]; unknown tags are rejected at the
/// submission surface.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Station,
    Loop,
    Delivery,
    ChargeBattery,
    Clean,
    Patrol,
}

impl TaskKind {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Station),
            1 => Some(Self::Loop),
            2 => Some(Self::Delivery),
            3 => Some(Self::ChargeBattery),
            4 => Some(Self::Clean),
            5 => Some(Self::Patrol),
            _ => None,
        }
    }

    pub fn tag(&self) -> u32 {
        match self {
            Self::Station => 0,
            Self::Loop => 1,
            Self::Delivery => 2,
            Self::ChargeBattery => 3,
            Self::Clean => 4,
            Self::Patrol => 5,
        }
    }

    /// The name used as the task ID prefix.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Station => "Station",
            Self::Loop => "Loop",
            Self::Delivery => "Delivery",
            Self::ChargeBattery => "ChargeBattery",
            Self::Clean => "Clean",
            Self::Patrol => "Patrol",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// The priority of a submitted task. The scheme is binary: any value above
/// zero is treated as high priority.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Priority {
    pub value: u32,
}

impl Priority {
    pub fn is_high(&self) -> bool {
        self.value > 0
    }
}

/// The kind-specific payload of a task description. Fleets inspect the
/// payload when constructing typed requests; the dispatcher only inspects
/// the kind tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPayload {
    None,
    Clean {
        start_waypoint: String,
    },
    Delivery {
        pickup_place: String,
        pickup_dispenser: String,
        dropoff_place: String,
        dropoff_ingestor: String,
    },
    Loop {
        start_name: String,
        finish_name: String,
        num_loops: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescription {
    /// The raw task kind tag as submitted.
    pub kind_tag: u32,
    pub start_time: DateTime<Utc>,
    pub priority: Priority,
    pub payload: TaskPayload,
}

impl TaskDescription {
    pub fn clean(start_waypoint: impl Into<String>) -> Self {
        Self {
            kind_tag: TaskKind::Clean.tag(),
            start_time: Utc::now(),
            priority: Priority::default(),
            payload: TaskPayload::Clean {
                start_waypoint: start_waypoint.into(),
            },
        }
    }

    pub fn delivery(
        pickup_place: impl Into<String>,
        pickup_dispenser: impl Into<String>,
        dropoff_place: impl Into<String>,
        dropoff_ingestor: impl Into<String>,
    ) -> Self {
        Self {
            kind_tag: TaskKind::Delivery.tag(),
            start_time: Utc::now(),
            priority: Priority::default(),
            payload: TaskPayload::Delivery {
                pickup_place: pickup_place.into(),
                pickup_dispenser: pickup_dispenser.into(),
                dropoff_place: dropoff_place.into(),
                dropoff_ingestor: dropoff_ingestor.into(),
            },
        }
    }

    pub fn loop_between(
        start_name: impl Into<String>,
        finish_name: impl Into<String>,
        num_loops: u32,
    ) -> Self {
        Self {
            kind_tag: TaskKind::Loop.tag(),
            start_time: Utc::now(),
            priority: Priority::default(),
            payload: TaskPayload::Loop {
                start_name: start_name.into(),
                finish_name: finish_name.into(),
                num_loops,
            },
        }
    }

    pub fn kind(&self) -> Option<TaskKind> {
        TaskKind::from_tag(self.kind_tag)
    }
}

/// The immutable record of a task submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProfile {
    pub task_id: TaskId,
    pub submission_time: DateTime<Utc>,
    pub description: TaskDescription,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum TaskState {
    /// The task has been submitted but not yet awarded to a fleet.
    Pending,
    /// The task has been committed to a robot queue on the winning fleet.
    Queued,
    /// A robot has begun executing the task.
    Executing,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    /// Entering a terminal state is irreversible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Queued => write!(f, "QUEUED"),
            Self::Executing => write!(f, "EXECUTING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// The mutable lifecycle record of a task. A status is owned by exactly one
/// of the dispatcher's two tables at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_profile: TaskProfile,
    pub fleet_name: Option<String>,
    pub robot_name: Option<String>,
    pub state: TaskState,
    pub status_message: Option<String>,
}

impl TaskStatus {
    pub fn new(task_profile: TaskProfile) -> Self {
        Self {
            task_profile,
            fleet_name: None,
            robot_name: None,
            state: TaskState::Pending,
            status_message: None,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_profile.task_id
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }
}

/// The snapshot form of a task status, published on the ongoing-tasks topic
/// and returned by the task list query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub fleet_name: Option<String>,
    pub robot_name: Option<String>,
    pub state: TaskState,
    pub submission_time: DateTime<Utc>,
}

impl From<&TaskStatus> for TaskSummary {
    fn from(status: &TaskStatus) -> Self {
        Self {
            task_id: status.task_profile.task_id.clone(),
            fleet_name: status.fleet_name.clone(),
            robot_name: status.robot_name.clone(),
            state: status.state,
            submission_time: status.task_profile.submission_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_tags() {
        for tag in 0..6 {
            let kind = TaskKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert!(TaskKind::from_tag(6).is_none());
        assert!(TaskKind::from_tag(42).is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Executing.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
    }

    #[test]
    fn test_binary_priority() {
        assert!(!Priority { value: 0 }.is_high());
        assert!(Priority { value: 1 }.is_high());
        assert!(Priority { value: 7 }.is_high());
    }
}
