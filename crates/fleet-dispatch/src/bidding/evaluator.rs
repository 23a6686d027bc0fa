use crate::bidding::BidProposal;

/// The policy used to pick a winner among the proposals collected during an
/// auction window. Returns the index of the winning proposal.
pub trait Evaluator: Send {
    fn choose(&self, proposals: &[BidProposal]) -> Option<usize>;
}

/// Pick the proposal with the lowest marginal cost `new_cost - prev_cost`.
/// This is the default policy: it favors the fleet whose schedule is
/// disturbed the least by accepting the task.
#[derive(Debug, Default)]
pub struct LeastFleetDiffCostEvaluator;

impl Evaluator for LeastFleetDiffCostEvaluator {
    fn choose(&self, proposals: &[BidProposal]) -> Option<usize> {
        proposals
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.new_cost - a.prev_cost).total_cmp(&(b.new_cost - b.prev_cost))
            })
            .map(|(index, _)| index)
    }
}

/// Pick the proposal with the lowest absolute `new_cost`.
#[derive(Debug, Default)]
pub struct LeastFleetCostEvaluator;

impl Evaluator for LeastFleetCostEvaluator {
    fn choose(&self, proposals: &[BidProposal]) -> Option<usize> {
        proposals
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.new_cost.total_cmp(&b.new_cost))
            .map(|(index, _)| index)
    }
}

/// Pick the proposal with the earliest finish time.
#[derive(Debug, Default)]
pub struct QuickestFinishEvaluator;

impl Evaluator for QuickestFinishEvaluator {
    fn choose(&self, proposals: &[BidProposal]) -> Option<usize> {
        proposals
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.finish_time)
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::id::TaskId;
    use crate::task::{TaskDescription, TaskProfile};

    fn proposal(fleet: &str, prev_cost: f64, new_cost: f64, finish_secs: i64) -> BidProposal {
        BidProposal {
            fleet_name: fleet.to_string(),
            task_profile: TaskProfile {
                task_id: TaskId::from("Loop0"),
                submission_time: Utc::now(),
                description: TaskDescription::loop_between("A", "B", 1),
            },
            robot_name: "robot_1".to_string(),
            prev_cost,
            new_cost,
            finish_time: Utc::now() + Duration::seconds(finish_secs),
        }
    }

    #[test]
    fn test_least_diff_cost() {
        let proposals = vec![
            proposal("f1", 10.0, 30.0, 100),
            proposal("f2", 25.0, 30.0, 200),
        ];
        // f2 has the same new cost but the smaller margin.
        assert_eq!(LeastFleetDiffCostEvaluator.choose(&proposals), Some(1));
    }

    #[test]
    fn test_least_cost() {
        let proposals = vec![
            proposal("f1", 0.0, 30.0, 100),
            proposal("f2", 0.0, 20.0, 200),
        ];
        assert_eq!(LeastFleetCostEvaluator.choose(&proposals), Some(1));
    }

    #[test]
    fn test_quickest_finish() {
        let proposals = vec![
            proposal("f1", 0.0, 30.0, 300),
            proposal("f2", 0.0, 20.0, 200),
            proposal("f3", 0.0, 50.0, 100),
        ];
        assert_eq!(QuickestFinishEvaluator.choose(&proposals), Some(2));
    }

    #[test]
    fn test_no_proposals() {
        assert_eq!(LeastFleetDiffCostEvaluator.choose(&[]), None);
        assert_eq!(LeastFleetCostEvaluator.choose(&[]), None);
        assert_eq!(QuickestFinishEvaluator.choose(&[]), None);
    }
}
