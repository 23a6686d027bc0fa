use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A named position on a fleet's navigation graph.
#[derive(Debug, Clone)]
pub struct Waypoint {
    index: usize,
    name: String,
    position: [f64; 2],
    charger: bool,
}

impl Waypoint {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn is_charger(&self) -> bool {
        self.charger
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Lane {
    pub from: usize,
    pub to: usize,
}

/// The navigation graph of a fleet. The core only queries it; graph
/// construction and trajectory planning live outside the core.
#[derive(Debug, Clone, Default)]
pub struct NavGraph {
    waypoints: Vec<Waypoint>,
    lanes: Vec<Lane>,
    closed_lanes: HashSet<usize>,
}

impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_waypoint(&mut self, name: impl Into<String>, position: [f64; 2]) -> usize {
        let index = self.waypoints.len();
        self.waypoints.push(Waypoint {
            index,
            name: name.into(),
            position,
            charger: false,
        });
        index
    }

    pub fn add_charger(&mut self, name: impl Into<String>, position: [f64; 2]) -> usize {
        let index = self.add_waypoint(name, position);
        self.waypoints[index].charger = true;
        index
    }

    pub fn add_lane(&mut self, from: usize, to: usize) -> usize {
        let index = self.lanes.len();
        self.lanes.push(Lane { from, to });
        index
    }

    pub fn waypoint(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn find_waypoint(&self, name: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.name == name)
    }

    pub fn charging_waypoints(&self) -> Vec<usize> {
        self.waypoints
            .iter()
            .filter(|w| w.charger)
            .map(|w| w.index)
            .collect()
    }

    /// The nearest charging waypoint from a start waypoint, by ideal path
    /// cost. Returns [None] when the graph has no charging waypoint.
    pub fn nearest_charger(&self, start: usize) -> Option<usize> {
        let from = self.waypoints.get(start)?.position;
        self.waypoints
            .iter()
            .filter(|w| w.charger)
            .min_by(|a, b| {
                let da = distance(from, a.position);
                let db = distance(from, b.position);
                da.total_cmp(&db)
            })
            .map(|w| w.index)
    }

    /// An estimate of the ideal travel cost between two waypoints, in meters.
    pub fn ideal_cost(&self, from: usize, to: usize) -> Option<f64> {
        let a = self.waypoints.get(from)?.position;
        let b = self.waypoints.get(to)?.position;
        Some(distance(a, b))
    }

    pub fn is_lane_open(&self, lane: usize) -> bool {
        !self.closed_lanes.contains(&lane)
    }

    /// Close the given lanes. Returns false when every lane was already
    /// closed, in which case the planner configuration is unchanged.
    pub fn close_lanes(&mut self, lanes: &[usize]) -> bool {
        let any_changes = lanes.iter().any(|lane| self.is_lane_open(*lane));
        if any_changes {
            self.closed_lanes.extend(lanes.iter().copied());
        }
        any_changes
    }

    /// Open the given lanes. Returns false when every lane was already open.
    pub fn open_lanes(&mut self, lanes: &[usize]) -> bool {
        let any_changes = lanes.iter().any(|lane| !self.is_lane_open(*lane));
        if any_changes {
            for lane in lanes {
                self.closed_lanes.remove(lane);
            }
        }
        any_changes
    }
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// The kinematic limits of the vehicles in a fleet, used to time
/// interpolated trajectories.
#[derive(Debug, Clone, Copy)]
pub struct VehicleTraits {
    /// The nominal linear velocity, in meters per second.
    pub linear_velocity: f64,
}

impl Default for VehicleTraits {
    fn default() -> Self {
        Self {
            linear_velocity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub time: DateTime<Utc>,
    pub pose: Pose,
}

/// A timed sequence of poses. Cleaning trajectories are interpolated from
/// dock paths; an empty trajectory means the dock path was unusable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn finish_time(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.time)
    }
}

/// Interpolate a sequence of positions into a timed trajectory using the
/// vehicle traits. Consecutive duplicate positions are collapsed, so a dock
/// path that never moves interpolates into an empty trajectory.
pub fn interpolate_positions(
    traits: &VehicleTraits,
    start_time: DateTime<Utc>,
    positions: &[Pose],
) -> Trajectory {
    let mut points: Vec<TrajectoryPoint> = Vec::new();
    let mut time = start_time;
    for pose in positions {
        if let Some(last) = points.last() {
            let dx = pose.x - last.pose.x;
            let dy = pose.y - last.pose.y;
            let d = (dx * dx + dy * dy).sqrt();
            if d == 0.0 {
                continue;
            }
            let seconds = d / traits.linear_velocity;
            time += Duration::milliseconds((seconds * 1e3) as i64);
        }
        points.push(TrajectoryPoint { time, pose: *pose });
    }
    if points.len() < 2 {
        // A single pose is not a motion.
        return Trajectory::default();
    }
    Trajectory { points }
}

/// Per-dock cleaning parameters, keyed by the dock's start waypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockParameters {
    pub start: String,
    pub finish: String,
    pub path: Vec<Pose>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_graph() -> NavGraph {
        let mut graph = NavGraph::new();
        graph.add_waypoint("A", [0.0, 0.0]);
        graph.add_waypoint("B", [10.0, 0.0]);
        graph.add_charger("charger_1", [2.0, 0.0]);
        graph.add_charger("charger_2", [8.0, 0.0]);
        graph.add_lane(0, 1);
        graph.add_lane(1, 0);
        graph
    }

    #[test]
    fn test_find_waypoint() {
        let graph = test_graph();
        assert_eq!(graph.find_waypoint("A").map(|w| w.index()), Some(0));
        assert_eq!(graph.find_waypoint("B").map(|w| w.index()), Some(1));
        assert!(graph.find_waypoint("C").is_none());
    }

    #[test]
    fn test_nearest_charger() {
        let graph = test_graph();
        assert_eq!(graph.nearest_charger(0), Some(2));
        assert_eq!(graph.nearest_charger(1), Some(3));

        let mut chargerless = NavGraph::new();
        chargerless.add_waypoint("A", [0.0, 0.0]);
        assert_eq!(chargerless.nearest_charger(0), None);
    }

    #[test]
    fn test_lane_closures() {
        let mut graph = test_graph();
        assert!(graph.is_lane_open(0));
        assert!(graph.close_lanes(&[0]));
        assert!(!graph.is_lane_open(0));
        // Closing an already closed lane is a no-op.
        assert!(!graph.close_lanes(&[0]));
        assert!(graph.open_lanes(&[0]));
        assert!(graph.is_lane_open(0));
        assert!(!graph.open_lanes(&[0]));
    }

    #[test]
    fn test_interpolate_positions() {
        let traits = VehicleTraits {
            linear_velocity: 1.0,
        };
        let start = Utc::now();
        let path = [
            Pose {
                x: 0.0,
                y: 0.0,
                yaw: 0.0,
            },
            Pose {
                x: 3.0,
                y: 4.0,
                yaw: 0.0,
            },
        ];
        let trajectory = interpolate_positions(&traits, start, &path);
        assert_eq!(trajectory.len(), 2);
        let finish = trajectory.finish_time().unwrap();
        assert_eq!((finish - start).num_seconds(), 5);
    }

    #[test]
    fn test_interpolate_degenerate_paths() {
        let traits = VehicleTraits::default();
        let start = Utc::now();
        assert!(interpolate_positions(&traits, start, &[]).is_empty());
        let stationary = [
            Pose {
                x: 1.0,
                y: 1.0,
                yaw: 0.0,
            },
            Pose {
                x: 1.0,
                y: 1.0,
                yaw: 0.0,
            },
        ];
        assert!(interpolate_positions(&traits, start, &stationary).is_empty());
    }
}
