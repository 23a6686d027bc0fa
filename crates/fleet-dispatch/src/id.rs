use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, DispatchResult};
use crate::task::TaskKind;

/// A globally unique task identifier minted by the dispatcher.
/// The string is `<TypeName><counter>` where the counter is a monotonic
/// per-process integer shared across all task kinds.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug)]
pub struct TaskIdGenerator {
    next_value: u64,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self { next_value: 0 }
    }

    pub fn next(&mut self, kind: TaskKind) -> DispatchResult<TaskId> {
        let value = self.next_value;
        self.next_value = value
            .checked_add(1)
            .ok_or_else(|| DispatchError::InternalError("task ID overflow".to_string()))?;
        Ok(TaskId(format!("{}{value}", kind.type_name())))
    }
}

impl Default for TaskIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_minting() {
        let mut generator = TaskIdGenerator::new();
        assert_eq!(generator.next(TaskKind::Clean).unwrap().as_str(), "Clean0");
        assert_eq!(generator.next(TaskKind::Loop).unwrap().as_str(), "Loop1");
        assert_eq!(
            generator.next(TaskKind::Delivery).unwrap().as_str(),
            "Delivery2"
        );
        // The counter is shared across kinds and strictly increasing.
        assert_eq!(generator.next(TaskKind::Clean).unwrap().as_str(), "Clean3");
    }
}
