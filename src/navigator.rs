//! Turn-by-turn navigation state machine.
//!
//! `Idle` → `Navigating` on route start, back to `Idle` on arrival or
//! cancel. Each fix is measured against the decision point of the current
//! instruction; crossing the prepare threshold warns once, crossing the
//! turn threshold executes the maneuver and advances by exactly one.
//!
//! Progress is forward-only: moving away from the target again never
//! re-arms the prepare warning for the same instruction.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::geo_distance::haversine_distance;
use crate::route::{Route, RouteSummary};
use crate::types::Coordinate;

/// Maneuver code of the synthetic action after the last instruction
pub const ARRIVAL_SIGN: i32 = 15;
pub const ARRIVAL_TEXT: &str = "Destination vicinity";

/// Display hint attached to a progress observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    None,
    Prepare,
}

/// Per-fix observation for the display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub next_instruction_text: String,
    pub next_sign: i32,
    pub remaining_distance_m: f64,
    pub suggestion: Suggestion,
}

/// Threshold crossings, in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavEvent {
    Prepare,
    Execute { sign: i32 },
    Arrived,
}

/// Everything one fix produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixOutcome {
    pub progress: Option<Progress>,
    pub events: Vec<NavEvent>,
    /// Index of the instruction now being walked toward, if the fix advanced the route
    pub advanced_to: Option<usize>,
}

impl FixOutcome {
    pub fn arrived(&self) -> bool {
        self.events.contains(&NavEvent::Arrived)
    }
}

/// Mutable state of one route being walked
#[derive(Debug, Clone)]
pub struct NavigationSession {
    route: Route,
    current_index: usize,
    prepared_notified: bool,
}

impl NavigationSession {
    fn new(route: Route) -> Self {
        Self {
            route,
            current_index: 0,
            prepared_notified: false,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn prepared_notified(&self) -> bool {
        self.prepared_notified
    }

    /// Text and sign of the maneuver at the current decision point
    pub fn next_action(&self) -> (&str, i32) {
        match self.route.instruction(self.current_index + 1) {
            Some(next) => (next.text.as_str(), next.sign),
            None => (ARRIVAL_TEXT, ARRIVAL_SIGN),
        }
    }

    fn on_fix(&mut self, config: &NavConfig, position: &Coordinate) -> NavResult<FixOutcome> {
        let mut outcome = FixOutcome::default();

        if self.current_index >= self.route.len() {
            outcome.events.push(NavEvent::Arrived);
            return Ok(outcome);
        }

        let target = self.route.target_of(self.current_index)?;
        let distance = haversine_distance(position, &target);
        let (next_text, next_sign) = self.next_action();

        let in_prepare_band =
            distance >= config.turn_distance_m && distance < config.prepare_distance_m;

        outcome.progress = Some(Progress {
            next_instruction_text: next_text.to_string(),
            next_sign,
            remaining_distance_m: distance,
            suggestion: if in_prepare_band {
                Suggestion::Prepare
            } else {
                Suggestion::None
            },
        });

        debug!(
            "instruction {}/{}: {:.1} m to \"{}\"",
            self.current_index,
            self.route.len(),
            distance,
            next_text
        );

        if in_prepare_band && !self.prepared_notified {
            outcome.events.push(NavEvent::Prepare);
            self.prepared_notified = true;
        }

        if distance < config.turn_distance_m {
            outcome.events.push(NavEvent::Execute { sign: next_sign });
            self.current_index += 1;
            self.prepared_notified = false;

            if self.current_index >= self.route.len() {
                outcome.events.push(NavEvent::Arrived);
            } else {
                outcome.advanced_to = Some(self.current_index);
            }
        }

        Ok(outcome)
    }
}

/// Navigator state
#[derive(Debug, Clone)]
pub enum NavState {
    /// No active route
    Idle,
    Navigating(NavigationSession),
}

/// Owns the configuration and at most one navigation session
pub struct Navigator {
    config: NavConfig,
    state: NavState,
}

impl Navigator {
    pub fn new(config: NavConfig) -> NavResult<Self> {
        config.validate()?;
        Ok(Navigator {
            config,
            state: NavState::Idle,
        })
    }

    /// Start walking `route`, replacing any session in progress.
    ///
    /// Returns the first-instruction overview for display. No event is
    /// produced here; the first event comes from a fix.
    pub fn start_route(&mut self, route: Route) -> RouteSummary {
        if let NavState::Navigating(previous) = &self.state {
            info!(
                "Replacing active route at instruction {}/{}",
                previous.current_index(),
                previous.route().len()
            );
        }

        let summary = route.summary();
        info!(
            "Route started: {} instructions, first \"{}\" (sign {})",
            route.len(),
            summary.first_text,
            summary.first_sign
        );
        self.state = NavState::Navigating(NavigationSession::new(route));
        summary
    }

    /// Evaluate one position fix against the active session.
    ///
    /// While idle the fix is ignored and the outcome is empty. An invalid
    /// fix is rejected without touching the session.
    pub fn on_fix(&mut self, position: Coordinate) -> NavResult<FixOutcome> {
        if !position.is_valid() {
            return Err(NavError::InvalidFix {
                latitude: position.latitude,
                longitude: position.longitude,
            });
        }

        let outcome = match &mut self.state {
            NavState::Idle => {
                debug!("Fix ignored: no active route");
                return Ok(FixOutcome::default());
            }
            NavState::Navigating(session) => session.on_fix(&self.config, &position)?,
        };

        if let Some(index) = outcome.advanced_to {
            info!("Advanced to instruction {}", index);
        }
        if outcome.arrived() {
            info!("Arrived at destination");
            self.state = NavState::Idle;
        }

        Ok(outcome)
    }

    /// Drop the active session without emitting anything.
    pub fn cancel(&mut self) {
        if let NavState::Navigating(session) = &self.state {
            info!(
                "Navigation cancelled at instruction {}/{}",
                session.current_index(),
                session.route().len()
            );
        }
        self.state = NavState::Idle;
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        match &self.state {
            NavState::Navigating(session) => Some(session),
            NavState::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, NavState::Navigating(_))
    }

    /// Instruction being walked toward; 0 while idle
    pub fn current_index(&self) -> usize {
        self.session().map(|s| s.current_index()).unwrap_or(0)
    }

    pub fn prepared_notified(&self) -> bool {
        self.session().map(|s| s.prepared_notified()).unwrap_or(false)
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_distance::EARTH_RADIUS_M;
    use crate::route::Instruction;

    const BASE: Coordinate = Coordinate {
        latitude: 35.6812,
        longitude: 139.7671,
    };

    fn meters_to_lat_deg(meters: f64) -> f64 {
        meters / (EARTH_RADIUS_M * std::f64::consts::PI / 180.0)
    }

    /// Points due north of BASE, `spacing_m` apart
    fn meridian(n: usize, spacing_m: f64) -> Vec<Coordinate> {
        (0..n)
            .map(|i| Coordinate::new(BASE.latitude + meters_to_lat_deg(i as f64 * spacing_m), BASE.longitude))
            .collect()
    }

    /// Point `meters` due south of `target`
    fn south_of(target: Coordinate, meters: f64) -> Coordinate {
        Coordinate::new(target.latitude - meters_to_lat_deg(meters), target.longitude)
    }

    fn two_step_route() -> Route {
        Route::new(
            meridian(6, 20.0),
            vec![
                Instruction::new("Continue straight", 0, 0, 3),
                Instruction::new("Turn right", 2, 3, 5),
            ],
        )
        .unwrap()
    }

    fn navigator() -> Navigator {
        Navigator::new(NavConfig::default()).unwrap()
    }

    #[test]
    fn test_initial_state_idle() {
        let nav = navigator();
        assert!(!nav.is_active());
        assert_eq!(nav.current_index(), 0);
        assert!(matches!(nav.state(), NavState::Idle));
    }

    #[test]
    fn test_start_route_shows_first_instruction() {
        let mut nav = navigator();
        let summary = nav.start_route(two_step_route());

        assert_eq!(summary.first_text, "Continue straight");
        assert_eq!(summary.first_sign, 0);
        assert!(nav.is_active());
        assert_eq!(nav.current_index(), 0);
        assert!(!nav.prepared_notified());
    }

    #[test]
    fn test_prepare_then_execute_scenario() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);

        let far = nav.on_fix(south_of(target, 50.0)).unwrap();
        assert!(far.events.is_empty());
        let progress = far.progress.unwrap();
        assert!((progress.remaining_distance_m - 50.0).abs() < 1e-6);
        assert_eq!(progress.suggestion, Suggestion::None);

        let near = nav.on_fix(south_of(target, 25.0)).unwrap();
        assert_eq!(near.events, vec![NavEvent::Prepare]);
        let progress = near.progress.unwrap();
        assert_eq!(progress.next_instruction_text, "Turn right");
        assert_eq!(progress.suggestion, Suggestion::Prepare);
        assert!(nav.prepared_notified());

        let turn = nav.on_fix(south_of(target, 10.0)).unwrap();
        assert_eq!(turn.events, vec![NavEvent::Execute { sign: 2 }]);
        assert_eq!(turn.advanced_to, Some(1));
        assert_eq!(nav.current_index(), 1);
        assert!(!nav.prepared_notified());
        assert!(nav.is_active());
    }

    #[test]
    fn test_last_instruction_falls_back_to_arrival() {
        let mut nav = navigator();
        let route = two_step_route();
        let first = route.target_of(0).unwrap();
        let last = route.target_of(1).unwrap();
        nav.start_route(route);

        nav.on_fix(south_of(first, 5.0)).unwrap();
        assert_eq!(nav.current_index(), 1);

        let approach = nav.on_fix(south_of(last, 35.0)).unwrap();
        let progress = approach.progress.unwrap();
        assert_eq!(progress.next_instruction_text, ARRIVAL_TEXT);
        assert_eq!(progress.next_sign, ARRIVAL_SIGN);

        let outcome = nav.on_fix(south_of(last, 3.0)).unwrap();
        assert_eq!(
            outcome.events,
            vec![NavEvent::Execute { sign: ARRIVAL_SIGN }, NavEvent::Arrived]
        );
        assert!(outcome.arrived());
        assert_eq!(outcome.advanced_to, None);
        assert!(!nav.is_active());
    }

    #[test]
    fn test_execute_fires_on_first_fix() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);

        let outcome = nav.on_fix(south_of(target, 4.0)).unwrap();
        assert_eq!(outcome.events, vec![NavEvent::Execute { sign: 2 }]);
        assert_eq!(nav.current_index(), 1);
    }

    #[test]
    fn test_prepare_skipped_when_distance_jumps() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);

        assert!(nav.on_fix(south_of(target, 45.0)).unwrap().events.is_empty());
        let outcome = nav.on_fix(south_of(target, 8.0)).unwrap();
        assert_eq!(outcome.events, vec![NavEvent::Execute { sign: 2 }]);
    }

    #[test]
    fn test_prepare_fires_once_per_instruction() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);

        let mut prepares = 0;
        for meters in [29.0, 27.5, 24.0, 21.0, 18.0, 15.5] {
            let outcome = nav.on_fix(south_of(target, meters)).unwrap();
            prepares += outcome
                .events
                .iter()
                .filter(|e| **e == NavEvent::Prepare)
                .count();
            assert_eq!(outcome.progress.unwrap().suggestion, Suggestion::Prepare);
        }
        assert_eq!(prepares, 1);
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn test_backtrack_does_not_rearm_prepare() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);

        assert_eq!(nav.on_fix(south_of(target, 25.0)).unwrap().events, vec![NavEvent::Prepare]);
        assert!(nav.on_fix(south_of(target, 60.0)).unwrap().events.is_empty());
        assert!(nav.on_fix(south_of(target, 25.0)).unwrap().events.is_empty());
        assert!(nav.prepared_notified());
    }

    #[test]
    fn test_never_arrives_while_out_of_range() {
        let mut nav = navigator();
        let route = two_step_route();
        let last = route.target_of(1).unwrap();
        let first = route.target_of(0).unwrap();
        nav.start_route(route);
        nav.on_fix(south_of(first, 1.0)).unwrap();

        for _ in 0..100 {
            let outcome = nav.on_fix(south_of(last, 16.0)).unwrap();
            assert!(!outcome.arrived());
        }
        assert!(nav.is_active());
        assert_eq!(nav.current_index(), 1);
    }

    #[test]
    fn test_cancel_mid_route() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);
        nav.on_fix(south_of(target, 5.0)).unwrap();
        nav.on_fix(south_of(target, 25.0)).unwrap();
        assert_eq!(nav.current_index(), 1);

        nav.cancel();
        assert!(!nav.is_active());
        assert_eq!(nav.current_index(), 0);
        assert!(!nav.prepared_notified());

        let outcome = nav.on_fix(south_of(target, 1.0)).unwrap();
        assert_eq!(outcome, FixOutcome::default());
    }

    #[test]
    fn test_arrival_is_terminal() {
        let mut nav = navigator();
        let route = Route::new(meridian(3, 20.0), vec![Instruction::new("Walk", 0, 0, 2)]).unwrap();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);

        assert!(nav.on_fix(target).unwrap().arrived());
        for meters in [0.0, 5.0, 20.0] {
            let outcome = nav.on_fix(south_of(target, meters)).unwrap();
            assert!(outcome.events.is_empty());
            assert!(outcome.progress.is_none());
        }
        assert!(!nav.is_active());
    }

    #[test]
    fn test_new_route_replaces_session() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);
        nav.on_fix(south_of(target, 25.0)).unwrap();
        nav.on_fix(south_of(target, 5.0)).unwrap();
        assert_eq!(nav.current_index(), 1);

        nav.start_route(two_step_route());
        assert_eq!(nav.current_index(), 0);
        assert!(!nav.prepared_notified());
        assert!(nav.is_active());
    }

    #[test]
    fn test_invalid_fix_leaves_session_untouched() {
        let mut nav = navigator();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);
        nav.on_fix(south_of(target, 25.0)).unwrap();

        let result = nav.on_fix(Coordinate::new(f64::NAN, 139.0));
        assert!(matches!(result, Err(NavError::InvalidFix { .. })));
        assert!(nav.is_active());
        assert!(nav.prepared_notified());
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn test_walk_advances_monotonically() {
        let mut nav = navigator();
        let coords = meridian(7, 50.0);
        let route = Route::new(
            coords,
            vec![
                Instruction::new("Head north", 0, 0, 2),
                Instruction::new("Turn left", -2, 2, 4),
                Instruction::new("Turn right", 2, 4, 6),
            ],
        )
        .unwrap();
        nav.start_route(route);

        let mut last_index = 0;
        let mut executes = Vec::new();
        let mut prepares = 0;
        let mut arrivals = 0;

        for step in 0..=160 {
            let position = Coordinate::new(
                BASE.latitude + meters_to_lat_deg(step as f64 * 2.0),
                BASE.longitude,
            );
            let outcome = nav.on_fix(position).unwrap();

            for event in &outcome.events {
                match event {
                    NavEvent::Prepare => prepares += 1,
                    NavEvent::Execute { sign } => executes.push(*sign),
                    NavEvent::Arrived => arrivals += 1,
                }
            }

            let executed = outcome
                .events
                .iter()
                .filter(|e| matches!(e, NavEvent::Execute { .. }))
                .count();
            assert!(executed <= 1);
            last_index += executed;
            if nav.is_active() {
                assert_eq!(nav.current_index(), last_index);
            }
        }
        assert_eq!(last_index, 3);

        assert_eq!(executes, vec![-2, 2, ARRIVAL_SIGN]);
        assert_eq!(prepares, 3);
        assert_eq!(arrivals, 1);
        assert!(!nav.is_active());
    }

    #[test]
    fn test_custom_thresholds() {
        let config = NavConfig {
            prepare_distance_m: 50.0,
            turn_distance_m: 5.0,
            ..NavConfig::default()
        };
        let mut nav = Navigator::new(config).unwrap();
        let route = two_step_route();
        let target = route.target_of(0).unwrap();
        nav.start_route(route);

        assert_eq!(nav.on_fix(south_of(target, 45.0)).unwrap().events, vec![NavEvent::Prepare]);
        assert!(nav.on_fix(south_of(target, 8.0)).unwrap().events.is_empty());
        assert_eq!(
            nav.on_fix(south_of(target, 4.0)).unwrap().events,
            vec![NavEvent::Execute { sign: 2 }]
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = NavConfig {
            prepare_distance_m: 10.0,
            turn_distance_m: 20.0,
            ..NavConfig::default()
        };
        assert!(Navigator::new(config).is_err());
    }
}
