//! Route model: decoded geometry plus the maneuver list that walks it.
//!
//! The wire types (`RouteData`, `RouteResponse`) follow the routing
//! provider's JSON. `Route` is the validated form a navigation session
//! owns; it cannot be built from inconsistent data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NavError, NavResult};
use crate::polyline;
use crate::types::Coordinate;

/// Polyline segment an instruction covers, as `[start, end]` coordinate indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Interval {
    pub start: usize,
    /// Decision point: where the next instruction's maneuver happens
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<[usize; 2]> for Interval {
    fn from(pair: [usize; 2]) -> Self {
        Interval::new(pair[0], pair[1])
    }
}

impl From<Interval> for [usize; 2] {
    fn from(interval: Interval) -> Self {
        [interval.start, interval.end]
    }
}

/// One maneuver step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub text: String,
    /// Provider maneuver code, passed through untouched
    pub sign: i32,
    pub interval: Interval,
    /// Segment length in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Segment duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
}

impl Instruction {
    pub fn new(text: &str, sign: i32, start: usize, end: usize) -> Self {
        Self {
            text: text.to_string(),
            sign,
            interval: Interval::new(start, end),
            distance: None,
            time: None,
            street_name: None,
        }
    }
}

/// One path as delivered by the routing provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteData {
    /// Encoded polyline
    pub points: String,
    pub instructions: Vec<Instruction>,
    /// Total length in meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Total duration in milliseconds
    #[serde(default)]
    pub time: Option<u64>,
}

/// Full routing provider response
#[derive(Clone, Debug, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub paths: Vec<RouteData>,
    /// Set by the provider instead of `paths` when the request failed
    #[serde(default)]
    pub message: Option<String>,
}

impl RouteResponse {
    /// First path of the response. Alternatives are ignored.
    pub fn into_first_path(self) -> NavResult<RouteData> {
        if let Some(message) = self.message {
            return Err(NavError::Provider(message));
        }
        self.paths.into_iter().next().ok_or_else(|| {
            NavError::RouteDataInconsistency("response contains no paths".to_string())
        })
    }
}

/// Parse either a full provider response or a bare path object.
pub fn parse_route_json(json: &str) -> NavResult<RouteData> {
    let value: Value = serde_json::from_str(json)?;
    if value.get("paths").is_some() || value.get("message").is_some() {
        let response: RouteResponse = serde_json::from_value(value)?;
        response.into_first_path()
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

/// Start-of-route overview for display
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_m: Option<f64>,
    pub duration_min: Option<f64>,
    pub first_text: String,
    pub first_sign: i32,
}

/// Validated route owned by a navigation session
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    coordinates: Vec<Coordinate>,
    instructions: Vec<Instruction>,
    distance_m: Option<f64>,
    time_ms: Option<u64>,
}

impl Route {
    /// Build a route, rejecting any instruction list that does not fit the geometry.
    pub fn new(coordinates: Vec<Coordinate>, instructions: Vec<Instruction>) -> NavResult<Self> {
        if instructions.is_empty() {
            return Err(NavError::RouteDataInconsistency(
                "instruction list is empty".to_string(),
            ));
        }

        let mut last_end = 0;
        for (i, inst) in instructions.iter().enumerate() {
            let Interval { start, end } = inst.interval;
            if start > end {
                return Err(NavError::RouteDataInconsistency(format!(
                    "instruction {} interval [{}, {}] is reversed",
                    i, start, end
                )));
            }
            if end >= coordinates.len() {
                return Err(NavError::RouteDataInconsistency(format!(
                    "instruction {} interval end {} exceeds {} decoded coordinates",
                    i,
                    end,
                    coordinates.len()
                )));
            }
            if end < last_end {
                return Err(NavError::RouteDataInconsistency(format!(
                    "instruction {} interval end {} precedes previous end {}",
                    i, end, last_end
                )));
            }
            last_end = end;
        }

        Ok(Route {
            coordinates,
            instructions,
            distance_m: None,
            time_ms: None,
        })
    }

    /// Decode the provider path and validate it.
    pub fn from_data(data: RouteData) -> NavResult<Self> {
        let coordinates = polyline::decode(&data.points)?;
        let mut route = Route::new(coordinates, data.instructions)?;
        route.distance_m = data.distance;
        route.time_ms = data.time;
        Ok(route)
    }

    /// Decision-point coordinate of instruction `index`.
    pub fn target_of(&self, index: usize) -> NavResult<Coordinate> {
        let inst = self
            .instructions
            .get(index)
            .ok_or(NavError::IndexOutOfRange {
                index,
                len: self.instructions.len(),
            })?;
        self.coordinates
            .get(inst.interval.end)
            .copied()
            .ok_or(NavError::IndexOutOfRange {
                index: inst.interval.end,
                len: self.coordinates.len(),
            })
    }

    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn summary(&self) -> RouteSummary {
        // Never empty: `new` rejects an empty instruction list
        let first = &self.instructions[0];
        RouteSummary {
            distance_m: self.distance_m,
            duration_min: self.time_ms.map(|ms| ms as f64 / 1000.0 / 60.0),
            first_text: first.text.clone(),
            first_sign: first.sign,
        }
    }
}
