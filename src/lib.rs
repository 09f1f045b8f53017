//! Coffee brew-ratio calculator and brew timer.
//!
//! Two independent pieces make up the app:
//!
//! - [`RatioEngine`] keeps coffee, ratio and water consistent while the user
//!   edits one of them through a scrollable picker.
//! - [`BrewTimer`] is a start/pause/reset stopwatch with a slide-to-start
//!   affordance.
//!
//! They only meet in [`BrewSession`], which routes scheduled callbacks to the
//! right component and lets timer transitions resize the picker panels.
//! Platform timers, the clock and vibration are injected, so the whole session
//! runs deterministically under [`ManualClock`] in tests.

pub mod browser;
pub mod clock;
pub mod config;
pub mod error;
pub mod haptics;
pub mod offline;
pub mod picker;
pub mod quantity;
pub mod ratio;
pub mod timer;

pub use clock::{Clock, Fired, ManualClock, Scheduler, Task, TimerHandle};
pub use error::{OfflineError, PickerError};
pub use haptics::{Haptics, NoHaptics};
pub use picker::{Emphasis, GestureInput, Rail};
pub use quantity::{BrewState, PickerSpec, QuantityKind};
pub use ratio::{Picker, RatioEngine, Reconciled};
pub use timer::{BrewTimer, PanelSizer, TimerDisplay, TimerLayout, TimerState};

use log::info;
use std::rc::Rc;

/// The calculator and the timer, built once at startup.
pub struct BrewSession {
    pub ratio: RatioEngine,
    pub timer: BrewTimer,
}

impl BrewSession {
    pub fn new(
        specs: &[PickerSpec],
        clock: Rc<dyn Clock>,
        scheduler: Rc<dyn Scheduler>,
        haptics: Rc<dyn Haptics>,
    ) -> Result<Self, PickerError> {
        let ratio = RatioEngine::initialize(specs, scheduler.clone(), haptics)?;
        let timer = BrewTimer::new(clock, scheduler);
        let brew = ratio.brew();
        info!(
            "brew session ready: {} g at 1:{} -> {} ml",
            brew.coffee, brew.ratio, brew.water
        );
        Ok(Self { ratio, timer })
    }

    /// Route a fired scheduler task to its owner.
    pub fn dispatch(&mut self, fired: Fired) {
        match fired.task {
            Task::Snap(kind) => {
                self.ratio.on_snap_due(kind, fired.handle);
            }
            Task::Tick => self.timer.on_tick(fired.handle),
            Task::FinishStart | Task::FinishReset => {
                self.timer.on_transition_due(fired, &mut self.ratio)
            }
        }
    }

    /// Cancel everything still scheduled.
    pub fn teardown(&mut self) {
        self.ratio.teardown();
        self.timer.teardown();
    }
}
