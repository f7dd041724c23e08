// Pedestrian turn-by-turn navigation core
// Tracks progress along a precomputed route and signals a wearable peripheral

pub mod config;
pub mod error;
pub mod geo_distance;
pub mod live_status;
pub mod navigator;
pub mod notifier;
pub mod polyline;
pub mod replay;
pub mod route;
pub mod tracker;
pub mod types;

pub use config::NavConfig;
pub use error::{DecodeError, NavError, NavResult, SinkError};
pub use geo_distance::haversine_distance;
pub use navigator::{FixOutcome, NavEvent, NavState, NavigationSession, Navigator, Progress, Suggestion};
pub use notifier::{ChannelSink, LogFeedback, NotificationDispatcher, SignalSink, VisualFeedback};
pub use route::{parse_route_json, Instruction, Interval, Route, RouteData, RouteSummary};
pub use tracker::{NavigationTracker, RunStats, TrackerInput};
pub use types::{Coordinate, Fix};
