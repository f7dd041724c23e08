//! Navigation tracker: the navigator wired to the notification dispatcher.
//!
//! Inputs (route start, fixes, cancel) are handled one at a time, each to
//! completion, in the order they arrive on the channel. Signal delivery
//! never gates the next input.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Receiver;

use crate::config::NavConfig;
use crate::error::NavResult;
use crate::live_status::{current_timestamp, NavStatus};
use crate::navigator::{FixOutcome, NavEvent, Navigator};
use crate::notifier::{DispatchStats, NotificationDispatcher, SignalSink, VisualFeedback};
use crate::route::{Route, RouteData, RouteSummary};
use crate::types::Fix;

/// One input from the user or the location provider
#[derive(Debug, Clone)]
pub enum TrackerInput {
    StartRoute(Route),
    Fix(Fix),
    Cancel,
}

/// Totals for one `run`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub routes_started: u64,
    pub fixes: u64,
    pub rejected_fixes: u64,
    pub cancels: u64,
    pub arrivals: u64,
    pub dispatch: DispatchStats,
}

pub struct NavigationTracker<S, F> {
    navigator: Navigator,
    dispatcher: NotificationDispatcher<S, F>,
    start_signal: Option<i32>,
    status: NavStatus,
    status_path: Option<String>,
}

impl<S: SignalSink, F: VisualFeedback> NavigationTracker<S, F> {
    pub fn new(config: NavConfig, sink: S, feedback: F) -> NavResult<Self> {
        let start_signal = config.start_signal;
        let dispatcher = NotificationDispatcher::new(sink, feedback, config.prepare_signal);
        let navigator = Navigator::new(config)?;

        Ok(NavigationTracker {
            navigator,
            dispatcher,
            start_signal,
            status: NavStatus::new(),
            status_path: None,
        })
    }

    /// Rewrite a status snapshot at `path` after every input handled by `run`
    pub fn with_status_file(mut self, path: impl Into<String>) -> Self {
        self.status_path = Some(path.into());
        self
    }

    pub fn start_route(&mut self, route: Route) -> RouteSummary {
        let instruction_count = route.len();
        let summary = self.navigator.start_route(route);

        if let Some(signal) = self.start_signal {
            let _ = self.dispatcher.send_signal(signal);
        }

        self.status.reset_progress();
        self.status.instruction_count = instruction_count;
        self.refresh_status();
        summary
    }

    /// Decode and validate provider data, then start it. Bad data leaves
    /// the current state untouched.
    pub fn start_route_data(&mut self, data: RouteData) -> NavResult<RouteSummary> {
        let route = Route::from_data(data)?;
        Ok(self.start_route(route))
    }

    pub fn handle_fix(&mut self, fix: &Fix) -> NavResult<FixOutcome> {
        let position = fix.position();
        let outcome = match self.navigator.on_fix(position) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.status.fixes_rejected += 1;
                return Err(e);
            }
        };

        // An Execute right before Arrived already carried the arrival sign
        let mut executed = false;
        for event in &outcome.events {
            match event {
                NavEvent::Arrived if executed => continue,
                NavEvent::Execute { .. } => executed = true,
                _ => {}
            }
            let _ = self.dispatcher.dispatch(event);
        }

        self.status.fixes_processed += 1;
        self.status.last_fix = Some(position);
        if let Some(progress) = &outcome.progress {
            self.status.next_instruction_text = Some(progress.next_instruction_text.clone());
            self.status.next_sign = Some(progress.next_sign);
            self.status.remaining_distance_m = Some(progress.remaining_distance_m);
            self.status.suggestion = progress.suggestion;
        }
        if outcome.arrived() {
            self.status.arrived = true;
        }
        self.refresh_status();

        Ok(outcome)
    }

    pub fn cancel(&mut self) {
        self.navigator.cancel();
        self.status.reset_progress();
        self.refresh_status();
    }

    /// Consume inputs until every sender is dropped.
    pub async fn run(&mut self, mut rx: Receiver<TrackerInput>) -> RunStats {
        let mut stats = RunStats::default();

        while let Some(input) = rx.recv().await {
            match input {
                TrackerInput::StartRoute(route) => {
                    let summary = self.start_route(route);
                    stats.routes_started += 1;
                    info!(
                        "Next: {} (sign {}){}",
                        summary.first_text,
                        summary.first_sign,
                        format_overview(&summary)
                    );
                }
                TrackerInput::Fix(fix) => {
                    stats.fixes += 1;
                    match self.handle_fix(&fix) {
                        Ok(outcome) => {
                            if outcome.arrived() {
                                stats.arrivals += 1;
                            }
                        }
                        Err(e) => {
                            stats.rejected_fixes += 1;
                            warn!("Fix rejected: {}", e);
                        }
                    }
                }
                TrackerInput::Cancel => {
                    stats.cancels += 1;
                    self.cancel();
                }
            }

            if let Some(path) = &self.status_path {
                if let Err(e) = self.status.save(path) {
                    warn!("Failed to write status to {}: {}", path, e);
                }
            }
        }

        stats.dispatch = self.dispatcher.stats();
        stats
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher<S, F> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut NotificationDispatcher<S, F> {
        &mut self.dispatcher
    }

    pub fn status(&self) -> &NavStatus {
        &self.status
    }

    fn refresh_status(&mut self) {
        self.status.timestamp = current_timestamp();
        self.status.active = self.navigator.is_active();
        self.status.current_index = if self.status.arrived {
            self.status.instruction_count
        } else {
            self.navigator.current_index()
        };
        self.status.apply_dispatch_stats(self.dispatcher.stats());
    }
}

fn format_overview(summary: &RouteSummary) -> String {
    match (summary.distance_m, summary.duration_min) {
        (Some(d), Some(t)) => format!(", route {:.0} m / {:.0} min", d, t),
        (Some(d), None) => format!(", route {:.0} m", d),
        _ => String::new(),
    }
}
