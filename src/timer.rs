//! Brew timer state machine.
//!
//! Elapsed time is always `now - anchor`, where the anchor is re-derived as
//! `now - elapsed` every time the timer (re)starts. Ticks only refresh the
//! display; a tick that arrives late, or not at all while the tab sleeps,
//! cannot make the timer drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Transitioning -> Running <-> Paused
//!   ^                                    |
//!   +------------- reset() --------------+
//! ```

use crate::clock::{Clock, Fired, Scheduler, Task, TimerHandle};
use crate::config::*;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Receiver of picker panel resizes requested by timer transitions.
pub trait PanelSizer {
    fn set_panel_height(&mut self, px: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    /// Slide-to-start animation in flight; input is locked.
    Transitioning,
    Running,
    Paused,
}

/// Which half of the timer panel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerLayout {
    /// "Slide to start" track.
    Slider,
    /// Elapsed time with pause/reset controls.
    Active,
}

/// Zero-padded `MM:SS` plus a centisecond field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerDisplay {
    pub minutes: String,
    pub seconds: String,
    pub centis: String,
}

impl TimerDisplay {
    pub fn from_ms(ms: u64) -> Self {
        let total_seconds = ms / 1000;
        Self {
            minutes: format!("{:02}", total_seconds / 60),
            seconds: format!("{:02}", total_seconds % 60),
            centis: format!("{:02}", (ms % 1000) / 10),
        }
    }
}

impl fmt::Display for TimerDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.minutes, self.seconds)
    }
}

/// Knob drag on the "slide to start" track.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SlideDrag {
    origin_x: f64,
    travel: f64,
    track_width: f64,
}

impl SlideDrag {
    fn max_slide(&self) -> f64 {
        (self.track_width - SLIDE_KNOB_PX).max(0.0)
    }

    fn knob_offset(&self) -> f64 {
        self.travel.clamp(0.0, self.max_slide())
    }

    fn triggers(&self) -> bool {
        self.travel > self.max_slide() * SLIDE_TRIGGER_FRACTION
    }
}

pub struct BrewTimer {
    state: TimerState,
    layout: TimerLayout,
    elapsed_ms: u64,
    anchor_ms: u64,
    tick: Option<TimerHandle>,
    transition: Option<TimerHandle>,
    slide: Option<SlideDrag>,
    parked_knob: f64,
    clock: Rc<dyn Clock>,
    scheduler: Rc<dyn Scheduler>,
}

impl BrewTimer {
    pub fn new(clock: Rc<dyn Clock>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            state: TimerState::Idle,
            layout: TimerLayout::Slider,
            elapsed_ms: 0,
            anchor_ms: 0,
            tick: None,
            transition: None,
            slide: None,
            parked_knob: 0.0,
            clock,
            scheduler,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn layout(&self) -> TimerLayout {
        self.layout
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn display(&self) -> TimerDisplay {
        TimerDisplay::from_ms(self.elapsed_ms)
    }

    /// Label for the pause/resume control.
    pub fn toggle_label(&self) -> &'static str {
        if self.state == TimerState::Paused {
            "Resume"
        } else {
            "Pause"
        }
    }

    /// Horizontal knob offset on the slide track, in pixels.
    pub fn knob_offset(&self) -> f64 {
        match (self.state, self.slide) {
            (_, Some(drag)) => drag.knob_offset(),
            (TimerState::Transitioning, None) => self.parked_knob,
            _ => 0.0,
        }
    }

    pub fn is_sliding(&self) -> bool {
        self.slide.is_some()
    }

    // ── Slide-to-start ──────────────────────────────────────────────

    /// Knob pressed. Ignored unless the timer is idle and no transition is in flight.
    pub fn slide_begin(&mut self, x: f64, track_width: f64) {
        if self.state != TimerState::Idle || self.transition.is_some() {
            return;
        }
        self.slide = Some(SlideDrag {
            origin_x: x,
            travel: 0.0,
            track_width,
        });
    }

    pub fn slide_move(&mut self, x: f64) {
        if let Some(drag) = self.slide.as_mut() {
            drag.travel = x - drag.origin_x;
        }
    }

    /// Knob released. Starts the timer when dragged far enough, otherwise the
    /// knob snaps back. Returns whether the start transition began.
    pub fn slide_end(&mut self) -> bool {
        match self.slide.take() {
            Some(drag) if drag.triggers() => {
                self.parked_knob = drag.max_slide();
                self.begin_start_gesture()
            }
            _ => false,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Play the slide transition, then start running. Only valid from `Idle`.
    pub fn begin_start_gesture(&mut self) -> bool {
        if self.state != TimerState::Idle {
            return false;
        }
        self.cancel_transition();
        self.slide = None;
        self.state = TimerState::Transitioning;
        self.transition = Some(
            self.scheduler
                .schedule_once(SLIDE_TRANSITION_MS, Task::FinishStart),
        );
        debug!("timer: start transition");
        true
    }

    /// Start or resume. No-op while running or while a start or reset
    /// transition is in flight.
    pub fn start(&mut self) {
        if self.transition.is_some() {
            return;
        }
        match self.state {
            TimerState::Idle | TimerState::Paused => self.run(),
            TimerState::Running | TimerState::Transitioning => {}
        }
    }

    pub fn pause(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        self.elapsed_ms = self.now().saturating_sub(self.anchor_ms);
        self.cancel_tick();
        self.state = TimerState::Paused;
        debug!("timer: paused at {} ms", self.elapsed_ms);
    }

    pub fn toggle(&mut self) {
        if self.state == TimerState::Running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Stop, zero and return to `Idle`, then play the reverse transition that
    /// hands the picker panels their full height back.
    pub fn reset(&mut self) {
        self.cancel_tick();
        self.cancel_transition();
        self.slide = None;
        self.parked_knob = 0.0;
        self.elapsed_ms = 0;
        self.anchor_ms = 0;
        self.state = TimerState::Idle;
        self.transition = Some(
            self.scheduler
                .schedule_once(RESET_TRANSITION_MS, Task::FinishReset),
        );
        info!("timer: reset");
    }

    /// Periodic refresh. Ignored unless `handle` is the live tick.
    pub fn on_tick(&mut self, handle: TimerHandle) {
        if self.tick != Some(handle) || self.state != TimerState::Running {
            return;
        }
        self.elapsed_ms = self.now().saturating_sub(self.anchor_ms);
    }

    /// End of a start or reset transition. Stale handles are ignored.
    pub fn on_transition_due(&mut self, fired: Fired, panels: &mut dyn PanelSizer) {
        if self.transition != Some(fired.handle) {
            return;
        }
        self.transition = None;
        match fired.task {
            Task::FinishStart if self.state == TimerState::Transitioning => {
                self.layout = TimerLayout::Active;
                self.run();
                panels.set_panel_height(PANEL_HEIGHT_TIMER_PX);
            }
            Task::FinishReset if self.state == TimerState::Idle => {
                self.layout = TimerLayout::Slider;
                panels.set_panel_height(PANEL_HEIGHT_PX);
            }
            _ => {}
        }
    }

    /// Cancel every scheduled callback. Called when the timer is torn down.
    pub fn teardown(&mut self) {
        self.cancel_tick();
        self.cancel_transition();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn run(&mut self) {
        self.anchor_ms = self.now().saturating_sub(self.elapsed_ms);
        self.cancel_tick();
        self.tick = Some(self.scheduler.schedule_every(TICK_MS, Task::Tick));
        self.state = TimerState::Running;
        debug!("timer: running from {} ms", self.elapsed_ms);
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn cancel_tick(&mut self) {
        if let Some(handle) = self.tick.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn cancel_transition(&mut self) {
        if let Some(handle) = self.transition.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl Drop for BrewTimer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[derive(Default)]
    struct Panels(Vec<u32>);

    impl PanelSizer for Panels {
        fn set_panel_height(&mut self, px: u32) {
            self.0.push(px);
        }
    }

    fn timer(clock: &Rc<ManualClock>) -> BrewTimer {
        BrewTimer::new(clock.clone(), clock.clone())
    }

    fn run_for(clock: &ManualClock, timer: &mut BrewTimer, panels: &mut Panels, ms: u64) {
        clock.advance(ms, |fired| match fired.task {
            Task::Tick => timer.on_tick(fired.handle),
            _ => timer.on_transition_due(fired, &mut *panels),
        });
    }

    #[test]
    fn start_pause_resume() {
        let clock = Rc::new(ManualClock::new(10_000));
        let mut timer = timer(&clock);
        let mut panels = Panels::default();
        assert_eq!(timer.state(), TimerState::Idle);

        timer.start();
        assert_eq!(timer.state(), TimerState::Running);
        run_for(&clock, &mut timer, &mut panels, 1_500);
        timer.pause();
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.elapsed_ms(), 1_500);
        assert_eq!(timer.toggle_label(), "Resume");

        run_for(&clock, &mut timer, &mut panels, 60_000);
        assert_eq!(timer.elapsed_ms(), 1_500);

        timer.start();
        run_for(&clock, &mut timer, &mut panels, 500);
        timer.pause();
        assert_eq!(timer.elapsed_ms(), 2_000);
    }

    #[test]
    fn missed_ticks_do_not_drift() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        timer.start();
        // the host delivers no ticks at all for 3.7 s
        clock.advance(3_700, |_| {});
        timer.pause();
        assert_eq!(timer.elapsed_ms(), 3_700);
    }

    #[test]
    fn invalid_transitions_are_ignored() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        timer.pause();
        assert_eq!(timer.state(), TimerState::Idle);

        timer.start();
        let pending = clock.pending();
        timer.start();
        assert_eq!(clock.pending(), pending);
        assert!(!timer.begin_start_gesture());
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[test]
    fn toggle_alternates() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        timer.toggle();
        assert_eq!(timer.state(), TimerState::Running);
        timer.toggle();
        assert_eq!(timer.state(), TimerState::Paused);
        timer.toggle();
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.toggle_label(), "Pause");
    }

    #[test]
    fn start_gesture_runs_after_transition_and_shrinks_panels() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        let mut panels = Panels::default();

        assert!(timer.begin_start_gesture());
        assert_eq!(timer.state(), TimerState::Transitioning);
        assert!(!timer.begin_start_gesture());
        timer.start();
        assert_eq!(timer.state(), TimerState::Transitioning);

        run_for(&clock, &mut timer, &mut panels, 399);
        assert_eq!(timer.state(), TimerState::Transitioning);
        run_for(&clock, &mut timer, &mut panels, 1);
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.layout(), TimerLayout::Active);
        assert_eq!(panels.0, vec![PANEL_HEIGHT_TIMER_PX]);

        run_for(&clock, &mut timer, &mut panels, 1_000);
        assert_eq!(timer.elapsed_ms(), 1_000);
    }

    #[test]
    fn reset_from_every_state() {
        let clock = Rc::new(ManualClock::new(0));
        let mut panels = Panels::default();

        for prepare in [
            (|_: &mut BrewTimer| {}) as fn(&mut BrewTimer),
            |t: &mut BrewTimer| t.start(),
            |t: &mut BrewTimer| {
                t.start();
                t.pause();
            },
            |t: &mut BrewTimer| {
                t.begin_start_gesture();
            },
        ] {
            let mut timer = timer(&clock);
            prepare(&mut timer);
            run_for(&clock, &mut timer, &mut panels, 250);
            timer.reset();
            assert_eq!(timer.state(), TimerState::Idle);
            assert_eq!(timer.elapsed_ms(), 0);
            assert_eq!(timer.display().to_string(), "00:00");
            assert_eq!(timer.display().centis, "00");
            assert_eq!(timer.toggle_label(), "Pause");
        }
    }

    #[test]
    fn reset_restores_layout_after_transition() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        let mut panels = Panels::default();
        timer.begin_start_gesture();
        run_for(&clock, &mut timer, &mut panels, 2_000);
        timer.reset();
        assert_eq!(timer.layout(), TimerLayout::Active);
        run_for(&clock, &mut timer, &mut panels, RESET_TRANSITION_MS as u64);
        assert_eq!(timer.layout(), TimerLayout::Slider);
        assert_eq!(panels.0, vec![PANEL_HEIGHT_TIMER_PX, PANEL_HEIGHT_PX]);
    }

    #[test]
    fn toggle_during_reset_transition_is_ignored() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        let mut panels = Panels::default();
        timer.begin_start_gesture();
        run_for(&clock, &mut timer, &mut panels, 2_000);

        timer.reset();
        timer.toggle();
        assert_eq!(timer.state(), TimerState::Idle);
        run_for(&clock, &mut timer, &mut panels, RESET_TRANSITION_MS as u64);

        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.layout(), TimerLayout::Slider);
        assert_eq!(clock.pending(), 0);
        timer.slide_begin(0.0, 380.0);
        assert!(timer.is_sliding());
    }

    #[test]
    fn reset_during_transition_cancels_the_start() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        let mut panels = Panels::default();
        timer.begin_start_gesture();
        run_for(&clock, &mut timer, &mut panels, 200);
        timer.reset();
        run_for(&clock, &mut timer, &mut panels, 1_000);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(panels.0, vec![PANEL_HEIGHT_PX]);
    }

    #[test]
    fn stale_tick_is_ignored_after_pause() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);
        timer.start();
        let ticks = clock.advance_collect(TICK_MS as u64);
        timer.pause();
        let frozen = timer.elapsed_ms();
        clock.advance(5_000, |_| {});
        for fired in ticks {
            timer.on_tick(fired.handle);
        }
        assert_eq!(timer.elapsed_ms(), frozen);
    }

    #[test]
    fn slide_needs_seventy_percent_of_the_track() {
        let clock = Rc::new(ManualClock::new(0));
        let mut timer = timer(&clock);

        // track 380 px, knob 80 px: 300 px of travel, trigger past 210
        timer.slide_begin(10.0, 380.0);
        timer.slide_move(200.0);
        assert_eq!(timer.knob_offset(), 190.0);
        assert!(!timer.slide_end());
        assert_eq!(timer.knob_offset(), 0.0);
        assert_eq!(timer.state(), TimerState::Idle);

        timer.slide_begin(10.0, 380.0);
        timer.slide_move(900.0);
        assert_eq!(timer.knob_offset(), 300.0);
        assert!(timer.slide_end());
        assert_eq!(timer.state(), TimerState::Transitioning);
        assert_eq!(timer.knob_offset(), 300.0);

        timer.slide_begin(0.0, 380.0);
        assert!(!timer.is_sliding());
    }

    #[test]
    fn display_pads_fields() {
        assert_eq!(TimerDisplay::from_ms(0).to_string(), "00:00");
        let display = TimerDisplay::from_ms(754_321);
        assert_eq!(display.to_string(), "12:34");
        assert_eq!(display.centis, "32");
        assert_eq!(TimerDisplay::from_ms(6_000_000).minutes, "100");
    }
}
