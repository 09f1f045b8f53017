//! The ratio engine: three pickers kept consistent by `water = coffee × ratio`.

use crate::clock::{Scheduler, Task, TimerHandle};
use crate::config::{HAPTIC_PULSE_MS, ITEM_HEIGHT_PX, PANEL_HEIGHT_PX, SNAP_DEBOUNCE_MS};
use crate::error::PickerError;
use crate::haptics::Haptics;
use crate::picker::{GestureEnd, GestureInput, PickerState, Rail};
use crate::quantity::{round_div, BrewState, PickerSpec, Quantity, QuantityKind};
use crate::timer::PanelSizer;
use log::debug;
use std::collections::BTreeMap;
use std::rc::Rc;

/// One picker column: the quantity and the rail that edits it.
#[derive(Debug, Clone)]
pub struct Picker {
    quantity: Quantity,
    state: PickerState,
}

impl Picker {
    fn new(spec: &PickerSpec) -> Result<Self, PickerError> {
        let quantity = Quantity::from_spec(spec)?;
        let rail = Rail::new(quantity.slot_count(), ITEM_HEIGHT_PX);
        let state = PickerState::new(rail, quantity.slot_of(quantity.value()));
        Ok(Self { quantity, state })
    }

    pub fn quantity(&self) -> &Quantity {
        &self.quantity
    }

    pub fn state(&self) -> &PickerState {
        &self.state
    }

    /// Slot of the stored value, or `None` while a derived value sits off-rail.
    pub fn active_slot(&self) -> Option<usize> {
        let value = self.quantity.value();
        self.quantity
            .contains(value)
            .then(|| self.quantity.slot_of(value))
    }

    /// `(slot, value)` for every item on the rail.
    pub fn items(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        (0..self.quantity.slot_count()).map(|slot| (slot, self.quantity.value_at(slot)))
    }
}

/// Outcome of a committed edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub edited: QuantityKind,
    pub value: u32,
    pub dependent: QuantityKind,
    pub dependent_value: u32,
}

pub struct RatioEngine {
    pickers: BTreeMap<QuantityKind, Picker>,
    panel_height: u32,
    scheduler: Rc<dyn Scheduler>,
    haptics: Rc<dyn Haptics>,
}

impl RatioEngine {
    /// Build one picker per spec. All three quantities must be present exactly once.
    pub fn initialize(
        specs: &[PickerSpec],
        scheduler: Rc<dyn Scheduler>,
        haptics: Rc<dyn Haptics>,
    ) -> Result<Self, PickerError> {
        let mut pickers = BTreeMap::new();
        for spec in specs {
            if pickers.contains_key(&spec.kind) {
                return Err(PickerError::DuplicateQuantity(spec.kind));
            }
            pickers.insert(spec.kind, Picker::new(spec)?);
        }
        if let Some(missing) = QuantityKind::ALL
            .into_iter()
            .find(|kind| !pickers.contains_key(kind))
        {
            return Err(PickerError::MissingQuantity(missing));
        }
        debug!("ratio engine initialized with {} pickers", pickers.len());
        Ok(Self {
            pickers,
            panel_height: PANEL_HEIGHT_PX,
            scheduler,
            haptics,
        })
    }

    pub fn picker(&self, kind: QuantityKind) -> &Picker {
        &self.pickers[&kind]
    }

    pub fn pickers(&self) -> impl Iterator<Item = &Picker> {
        self.pickers.values()
    }

    pub fn value(&self, kind: QuantityKind) -> u32 {
        self.picker(kind).quantity.value()
    }

    pub fn brew(&self) -> BrewState {
        BrewState {
            coffee: self.value(QuantityKind::Coffee),
            ratio: self.value(QuantityKind::Ratio),
            water: self.value(QuantityKind::Water),
        }
    }

    pub fn panel_height(&self) -> u32 {
        self.panel_height
    }

    /// Distance from the panel top to its centre line.
    pub fn panel_center(&self) -> f64 {
        self.panel_height as f64 / 2.0
    }

    pub fn set_panel_height(&mut self, px: u32) {
        self.panel_height = px;
    }

    /// Clamp `raw` into the quantity's bounds and, when that changes the stored
    /// value, recompute the dependent quantity and reposition both rails.
    ///
    /// Returns `None` when the clamped value equals the stored one; nothing is
    /// recomputed or redrawn in that case.
    pub fn set_quantity(&mut self, kind: QuantityKind, raw: i64) -> Option<Reconciled> {
        let value = {
            let picker = self.pickers.get_mut(&kind)?;
            let value = picker.quantity.clamp(raw);
            if value == picker.quantity.value() {
                return None;
            }
            picker.quantity.store(value);
            value
        };
        self.reposition(kind, true);

        let dependent = kind.dependent();
        let dependent_value = match dependent {
            QuantityKind::Water => self.value(QuantityKind::Coffee) * self.value(QuantityKind::Ratio),
            _ => {
                let coffee = round_div(self.value(QuantityKind::Water), self.value(QuantityKind::Ratio));
                self.picker(QuantityKind::Coffee).quantity.clamp(coffee as i64)
            }
        };
        if let Some(picker) = self.pickers.get_mut(&dependent) {
            picker.quantity.store(dependent_value);
        }
        self.reposition(dependent, false);

        debug!("{kind} set to {value}, {dependent} now {dependent_value}");
        Some(Reconciled {
            edited: kind,
            value,
            dependent,
            dependent_value,
        })
    }

    /// [`set_quantity`](Self::set_quantity) addressed by name.
    pub fn set_quantity_named(&mut self, name: &str, raw: i64) -> Result<Option<Reconciled>, PickerError> {
        let kind = name.parse::<QuantityKind>()?;
        Ok(self.set_quantity(kind, raw))
    }

    /// Feed one panel-relative input event to a picker.
    ///
    /// Drags and scrolls only move the rail; their value is committed when
    /// the pointer is released or, for scrolls, once the debounce elapses.
    /// Wheel notches, taps and item selections commit at once.
    pub fn handle_gesture(&mut self, kind: QuantityKind, input: GestureInput) -> Option<Reconciled> {
        match input {
            GestureInput::PointerDown { y } => {
                self.cancel_snap(kind);
                self.pickers.get_mut(&kind)?.state.begin_drag(y);
                None
            }
            GestureInput::PointerMove { y } => {
                self.pickers.get_mut(&kind)?.state.drag_to(y);
                None
            }
            GestureInput::PointerUp | GestureInput::PointerCancel => {
                match self.pickers.get_mut(&kind)?.state.end_drag()? {
                    GestureEnd::Settle(slot) => self.commit_slot(kind, slot),
                    GestureEnd::Press => None,
                }
            }
            GestureInput::Scroll { offset } => {
                if self.pickers.get_mut(&kind)?.state.scroll_to(offset) {
                    self.cancel_snap(kind);
                    let handle = self.scheduler.schedule_once(SNAP_DEBOUNCE_MS, Task::Snap(kind));
                    self.pickers.get_mut(&kind)?.state.set_pending_snap(handle);
                }
                None
            }
            GestureInput::Wheel { delta_y } => {
                if delta_y == 0.0 {
                    return None;
                }
                self.step(kind, if delta_y > 0.0 { 1 } else { -1 })
            }
            GestureInput::Tap { y } => {
                let from_center = y - self.panel_center();
                if from_center.abs() <= ITEM_HEIGHT_PX / 2.0 {
                    return None;
                }
                self.step(kind, if from_center > 0.0 { 1 } else { -1 })
            }
            GestureInput::Select { value } => {
                self.cancel_snap(kind);
                self.commit(kind, value as i64)
            }
        }
    }

    /// Debounced scroll end. Ignored unless `handle` is the picker's current
    /// pending snap.
    pub fn on_snap_due(&mut self, kind: QuantityKind, handle: TimerHandle) -> Option<Reconciled> {
        let picker = self.pickers.get_mut(&kind)?;
        if picker.state.pending_snap() != Some(handle) {
            debug!("{kind}: dropping stale snap {}", handle.id());
            return None;
        }
        picker.state.take_pending_snap();
        match picker.state.end_scroll() {
            GestureEnd::Settle(slot) => self.commit_slot(kind, slot),
            GestureEnd::Press => None,
        }
    }

    /// Cancel every pending snap. Called when the pickers are torn down.
    pub fn teardown(&mut self) {
        for kind in QuantityKind::ALL {
            self.cancel_snap(kind);
        }
    }

    fn step(&mut self, kind: QuantityKind, delta: i64) -> Option<Reconciled> {
        self.cancel_snap(kind);
        let current = self.value(kind) as i64;
        self.commit(kind, current + delta)
    }

    fn commit_slot(&mut self, kind: QuantityKind, slot: usize) -> Option<Reconciled> {
        let picker = self.pickers.get_mut(&kind)?;
        let value = picker.quantity.value_at(slot);
        picker.state.settle(slot, true);
        self.commit(kind, value as i64)
    }

    /// Commit a user edit. An edit that lands on the stored value still
    /// settles the rail, since the gesture it ends may have moved it.
    fn commit(&mut self, kind: QuantityKind, raw: i64) -> Option<Reconciled> {
        match self.set_quantity(kind, raw) {
            Some(reconciled) => {
                self.haptics.pulse(HAPTIC_PULSE_MS);
                Some(reconciled)
            }
            None => {
                self.reposition(kind, true);
                None
            }
        }
    }

    fn reposition(&mut self, kind: QuantityKind, smooth: bool) {
        self.cancel_snap(kind);
        if let Some(picker) = self.pickers.get_mut(&kind) {
            let slot = picker.quantity.slot_of(picker.quantity.value());
            picker.state.settle(slot, smooth);
        }
    }

    fn cancel_snap(&mut self, kind: QuantityKind) {
        if let Some(handle) = self
            .pickers
            .get_mut(&kind)
            .and_then(|picker| picker.state.take_pending_snap())
        {
            self.scheduler.cancel(handle);
        }
    }
}

impl PanelSizer for RatioEngine {
    fn set_panel_height(&mut self, px: u32) {
        RatioEngine::set_panel_height(self, px);
    }
}

impl Drop for RatioEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::haptics::NoHaptics;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingHaptics(Cell<u32>);

    impl Haptics for CountingHaptics {
        fn pulse(&self, _duration_ms: u32) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn engine(clock: &Rc<ManualClock>) -> RatioEngine {
        RatioEngine::initialize(&PickerSpec::defaults(), clock.clone(), Rc::new(NoHaptics)).unwrap()
    }

    #[test]
    fn initial_state_matches_defaults() {
        let clock = Rc::new(ManualClock::new(0));
        let engine = engine(&clock);
        assert_eq!(
            engine.brew(),
            BrewState {
                coffee: 20,
                ratio: 15,
                water: 300
            }
        );
        assert_eq!(engine.picker(QuantityKind::Coffee).state().offset(), 19.0 * 50.0);
        assert_eq!(engine.picker(QuantityKind::Water).active_slot(), Some(250));
    }

    #[test]
    fn initialize_requires_each_quantity_once() {
        let clock = Rc::new(ManualClock::new(0));
        let [coffee, ratio, _] = PickerSpec::defaults();
        let missing = RatioEngine::initialize(&[coffee, ratio], clock.clone(), Rc::new(NoHaptics));
        assert_eq!(missing.err(), Some(PickerError::MissingQuantity(QuantityKind::Water)));

        let twice = RatioEngine::initialize(&[coffee, coffee], clock, Rc::new(NoHaptics));
        assert_eq!(twice.err(), Some(PickerError::DuplicateQuantity(QuantityKind::Coffee)));
    }

    #[test]
    fn editing_water_solves_for_coffee() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.set_quantity(QuantityKind::Ratio, 16);
        assert_eq!(engine.value(QuantityKind::Water), 320);

        let result = engine.set_quantity(QuantityKind::Water, 300).unwrap();
        assert_eq!(result.dependent, QuantityKind::Coffee);
        assert_eq!(result.dependent_value, 19);
        assert_eq!(engine.value(QuantityKind::Ratio), 16);
        assert_eq!(engine.value(QuantityKind::Water), 300);
    }

    #[test]
    fn idempotent_set_leaves_everything_alone() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        let revisions: Vec<u64> = engine.pickers().map(|p| p.state().revision()).collect();

        assert_eq!(engine.set_quantity(QuantityKind::Coffee, 20), None);
        assert_eq!(engine.set_quantity(QuantityKind::Water, 300), None);

        let after: Vec<u64> = engine.pickers().map(|p| p.state().revision()).collect();
        assert_eq!(revisions, after);
    }

    #[test]
    fn clamped_value_equal_to_stored_is_idempotent() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.set_quantity(QuantityKind::Coffee, 100);
        assert_eq!(engine.set_quantity(QuantityKind::Coffee, 250), None);
    }

    #[test]
    fn derived_water_off_rail_has_no_active_item() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.set_quantity(QuantityKind::Coffee, 1);
        engine.set_quantity(QuantityKind::Ratio, 1);
        let water = engine.picker(QuantityKind::Water);
        assert_eq!(water.quantity().value(), 1);
        assert_eq!(water.active_slot(), None);
        assert_eq!(water.state().offset(), 0.0);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        assert!(engine.set_quantity_named("milk", 3).is_err());
        assert_eq!(
            engine.set_quantity_named("coffee", 21).unwrap().map(|r| r.dependent_value),
            Some(315)
        );
    }

    #[test]
    fn wheel_and_tap_step_by_one() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.handle_gesture(QuantityKind::Coffee, GestureInput::Wheel { delta_y: 120.0 });
        assert_eq!(engine.value(QuantityKind::Coffee), 21);
        engine.handle_gesture(QuantityKind::Coffee, GestureInput::Wheel { delta_y: -3.0 });
        assert_eq!(engine.value(QuantityKind::Coffee), 20);

        // panel is 250 px tall, centre line at 125
        engine.handle_gesture(QuantityKind::Ratio, GestureInput::Tap { y: 20.0 });
        assert_eq!(engine.value(QuantityKind::Ratio), 14);
        engine.handle_gesture(QuantityKind::Ratio, GestureInput::Tap { y: 230.0 });
        assert_eq!(engine.value(QuantityKind::Ratio), 15);
        assert_eq!(engine.handle_gesture(QuantityKind::Ratio, GestureInput::Tap { y: 130.0 }), None);
        assert_eq!(engine.value(QuantityKind::Water), 300);
    }

    #[test]
    fn drag_commits_only_on_release() {
        let clock = Rc::new(ManualClock::new(0));
        let haptics = Rc::new(CountingHaptics::default());
        let mut engine =
            RatioEngine::initialize(&PickerSpec::defaults(), clock.clone(), haptics.clone()).unwrap();

        engine.handle_gesture(QuantityKind::Coffee, GestureInput::PointerDown { y: 200.0 });
        engine.handle_gesture(QuantityKind::Coffee, GestureInput::PointerMove { y: 100.0 });
        assert_eq!(engine.value(QuantityKind::Coffee), 20);
        assert_eq!(engine.picker(QuantityKind::Coffee).state().highlighted(), 21);

        let result = engine.handle_gesture(QuantityKind::Coffee, GestureInput::PointerUp);
        assert_eq!(result.map(|r| r.value), Some(22));
        assert_eq!(engine.value(QuantityKind::Water), 330);
        assert_eq!(haptics.0.get(), 1);
        let state = engine.picker(QuantityKind::Coffee).state();
        assert_eq!(state.offset(), 21.0 * 50.0);
        assert!(state.smooth());
    }

    #[test]
    fn press_without_travel_commits_nothing() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.handle_gesture(QuantityKind::Water, GestureInput::PointerDown { y: 40.0 });
        assert_eq!(engine.handle_gesture(QuantityKind::Water, GestureInput::PointerUp), None);
        assert_eq!(engine.brew().water, 300);
    }

    #[test]
    fn select_commits_immediately() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.handle_gesture(QuantityKind::Ratio, GestureInput::Select { value: 17 });
        assert_eq!(engine.brew().water, 340);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn selecting_the_stored_value_ends_a_scroll() {
        let clock = Rc::new(ManualClock::new(0));
        let haptics = Rc::new(CountingHaptics::default());
        let mut engine =
            RatioEngine::initialize(&PickerSpec::defaults(), clock.clone(), haptics.clone()).unwrap();
        engine.handle_gesture(QuantityKind::Coffee, GestureInput::Scroll { offset: 1_010.0 });

        assert_eq!(
            engine.handle_gesture(QuantityKind::Coffee, GestureInput::Select { value: 20 }),
            None
        );
        let state = engine.picker(QuantityKind::Coffee).state();
        assert!(!state.is_scrolling());
        assert_eq!(state.offset(), 950.0);
        assert_eq!(state.highlighted(), 19);
        assert_eq!(state.pending_snap(), None);
        assert_eq!(clock.pending(), 0);
        assert_eq!(haptics.0.get(), 0);
    }

    #[test]
    fn wheel_past_the_bound_settles_on_the_bound() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.set_quantity(QuantityKind::Ratio, 50);
        engine.handle_gesture(QuantityKind::Ratio, GestureInput::Scroll { offset: 2_430.0 });

        assert_eq!(
            engine.handle_gesture(QuantityKind::Ratio, GestureInput::Wheel { delta_y: 120.0 }),
            None
        );
        assert_eq!(engine.value(QuantityKind::Ratio), 50);
        let state = engine.picker(QuantityKind::Ratio).state();
        assert!(!state.is_scrolling());
        assert_eq!(state.offset(), 49.0 * 50.0);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn stale_snap_handle_is_ignored() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.handle_gesture(QuantityKind::Coffee, GestureInput::Scroll { offset: 1_210.0 });
        let first = engine.picker(QuantityKind::Coffee).state().pending_snap().unwrap();
        engine.handle_gesture(QuantityKind::Coffee, GestureInput::Scroll { offset: 1_260.0 });

        assert_eq!(engine.on_snap_due(QuantityKind::Coffee, first), None);
        assert_eq!(engine.value(QuantityKind::Coffee), 20);
        assert!(engine.picker(QuantityKind::Coffee).state().is_scrolling());
    }

    #[test]
    fn editing_a_quantity_cancels_the_dependent_pending_snap() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.handle_gesture(QuantityKind::Water, GestureInput::Scroll { offset: 9_000.0 });
        assert_eq!(clock.pending(), 1);

        engine.set_quantity(QuantityKind::Coffee, 30);
        assert_eq!(clock.pending(), 0);
        assert_eq!(engine.value(QuantityKind::Water), 450);
        assert!(!engine.picker(QuantityKind::Water).state().in_gesture());
    }

    #[test]
    fn panel_height_applies_to_every_picker() {
        let clock = Rc::new(ManualClock::new(0));
        let mut engine = engine(&clock);
        engine.set_panel_height(100);
        assert_eq!(engine.panel_height(), 100);
        assert_eq!(engine.panel_center(), 50.0);
    }
}
