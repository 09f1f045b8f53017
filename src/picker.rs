//! Gesture tracking for one picker rail.
//!
//! A rail is a vertical strip of equally sized slots, one per value. Offset `0`
//! centres the first slot in the panel; offset `slot * item_height` centres
//! slot `slot`. Gestures move a fractional offset over the rail and the nearest
//! slot is tracked live for emphasis only. Committing a value is the engine's
//! job (see [`crate::ratio`]); this module only decides *where* the rail is and
//! *which* slot a gesture ended on.

use crate::clock::TimerHandle;
use crate::config::DRAG_SLOP_PX;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rail {
    slots: usize,
    item_height: f64,
}

impl Rail {
    pub fn new(slots: usize, item_height: f64) -> Self {
        Self {
            slots: slots.max(1),
            item_height: if item_height > 0.0 { item_height } else { 1.0 },
        }
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    pub fn offset_of(&self, slot: usize) -> f64 {
        slot.min(self.slots - 1) as f64 * self.item_height
    }

    pub fn max_offset(&self) -> f64 {
        self.offset_of(self.slots - 1)
    }

    pub fn clamp_offset(&self, offset: f64) -> f64 {
        if offset.is_nan() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_offset())
    }

    /// Slot whose centre is closest to `offset`.
    ///
    /// Only the two slots bracketing the offset can win; when they are
    /// equidistant the lower one does.
    pub fn nearest_slot(&self, offset: f64) -> usize {
        let offset = self.clamp_offset(offset);
        let lower = ((offset / self.item_height).floor() as usize).min(self.slots - 1);
        let upper = (lower + 1).min(self.slots - 1);
        let to_lower = (offset - self.offset_of(lower)).abs();
        let to_upper = (self.offset_of(upper) - offset).abs();
        if to_upper < to_lower {
            upper
        } else {
            lower
        }
    }

    /// Visual weight of `slot` while the rail sits at `offset`.
    pub fn emphasis(&self, slot: usize, offset: f64) -> Emphasis {
        let distance = (self.offset_of(slot) - offset).abs() / self.item_height;
        Emphasis {
            scale: (1.0 - 0.15 * distance).max(0.7),
            opacity: (1.0 - 0.35 * distance).max(0.25),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emphasis {
    pub scale: f64,
    pub opacity: f64,
}

/// Panel-relative input for one picker. `y` values are measured from the top
/// of the visible panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureInput {
    PointerDown { y: f64 },
    PointerMove { y: f64 },
    PointerUp,
    PointerCancel,
    /// Native scroll reported a new absolute offset.
    Scroll { offset: f64 },
    Wheel { delta_y: f64 },
    /// Tap on the panel background, away from any item.
    Tap { y: f64 },
    /// Tap or click directly on the item holding `value`.
    Select { value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Dragging { origin_y: f64, origin_offset: f64, moved: bool },
    Scrolling,
}

/// Where a drag or scroll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEnd {
    /// The rail moved; settle on this slot.
    Settle(usize),
    /// Press and release without travel.
    Press,
}

#[derive(Debug, Clone)]
pub struct PickerState {
    rail: Rail,
    offset: f64,
    highlighted: usize,
    gesture: Gesture,
    pending_snap: Option<TimerHandle>,
    smooth: bool,
    revision: u64,
}

impl PickerState {
    pub fn new(rail: Rail, slot: usize) -> Self {
        let offset = rail.offset_of(slot);
        Self {
            rail,
            offset,
            highlighted: rail.nearest_slot(offset),
            gesture: Gesture::Idle,
            pending_snap: None,
            smooth: false,
            revision: 0,
        }
    }

    pub fn rail(&self) -> &Rail {
        &self.rail
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Slot currently nearest the panel centre.
    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    /// Whether the last reposition should animate.
    pub fn smooth(&self) -> bool {
        self.smooth
    }

    /// Bumped on every visual change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_gesture(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn is_scrolling(&self) -> bool {
        matches!(self.gesture, Gesture::Scrolling)
    }

    pub fn pending_snap(&self) -> Option<TimerHandle> {
        self.pending_snap
    }

    pub fn emphasis(&self, slot: usize) -> Emphasis {
        self.rail.emphasis(slot, self.offset)
    }

    pub(crate) fn take_pending_snap(&mut self) -> Option<TimerHandle> {
        self.pending_snap.take()
    }

    pub(crate) fn set_pending_snap(&mut self, handle: TimerHandle) {
        self.pending_snap = Some(handle);
    }

    /// Jump or glide to `slot` and end any gesture.
    pub(crate) fn settle(&mut self, slot: usize, smooth: bool) {
        self.offset = self.rail.offset_of(slot);
        self.highlighted = self.rail.nearest_slot(self.offset);
        self.gesture = Gesture::Idle;
        self.smooth = smooth;
        self.touch();
    }

    pub(crate) fn begin_drag(&mut self, y: f64) {
        self.gesture = Gesture::Dragging {
            origin_y: y,
            origin_offset: self.offset,
            moved: false,
        };
        self.smooth = false;
    }

    /// Follow the pointer; returns whether the rail moved.
    pub(crate) fn drag_to(&mut self, y: f64) -> bool {
        let Gesture::Dragging {
            origin_y,
            origin_offset,
            moved,
        } = self.gesture
        else {
            return false;
        };
        let travel = origin_y - y;
        if !moved && travel.abs() < DRAG_SLOP_PX {
            return false;
        }
        self.gesture = Gesture::Dragging {
            origin_y,
            origin_offset,
            moved: true,
        };
        self.move_to(origin_offset + travel)
    }

    pub(crate) fn end_drag(&mut self) -> Option<GestureEnd> {
        let Gesture::Dragging { moved, .. } = self.gesture else {
            return None;
        };
        self.gesture = Gesture::Idle;
        Some(if moved {
            GestureEnd::Settle(self.rail.nearest_slot(self.offset))
        } else {
            GestureEnd::Press
        })
    }

    /// Track a native scroll position; returns whether the rail moved.
    /// Scroll events echoing a drag, or the rail's own position, are ignored.
    pub(crate) fn scroll_to(&mut self, offset: f64) -> bool {
        let offset = self.rail.clamp_offset(offset);
        if matches!(self.gesture, Gesture::Dragging { .. }) || (offset - self.offset).abs() < 1.0 {
            return false;
        }
        self.gesture = Gesture::Scrolling;
        self.smooth = false;
        self.move_to(offset)
    }

    pub(crate) fn end_scroll(&mut self) -> GestureEnd {
        self.gesture = Gesture::Idle;
        GestureEnd::Settle(self.rail.nearest_slot(self.offset))
    }

    fn move_to(&mut self, offset: f64) -> bool {
        let offset = self.rail.clamp_offset(offset);
        if offset == self.offset {
            return false;
        }
        self.offset = offset;
        self.highlighted = self.rail.nearest_slot(offset);
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rail() -> Rail {
        Rail::new(100, 50.0)
    }

    #[test]
    fn nearest_slot_rounds_to_closest() {
        let rail = rail();
        assert_eq!(rail.nearest_slot(0.0), 0);
        assert_eq!(rail.nearest_slot(24.9), 0);
        assert_eq!(rail.nearest_slot(25.1), 1);
        assert_eq!(rail.nearest_slot(949.0), 19);
        assert_eq!(rail.nearest_slot(-300.0), 0);
        assert_eq!(rail.nearest_slot(1e9), 99);
        assert_eq!(rail.nearest_slot(f64::NAN), 0);
    }

    #[test]
    fn equidistant_offsets_pick_the_lower_slot() {
        let rail = rail();
        assert_eq!(rail.nearest_slot(25.0), 0);
        assert_eq!(rail.nearest_slot(975.0), 19);
        assert_eq!(rail.nearest_slot(4925.0), 98);
    }

    #[test]
    fn emphasis_fades_with_distance() {
        let rail = rail();
        let centred = rail.emphasis(3, 150.0);
        assert_eq!(centred, Emphasis { scale: 1.0, opacity: 1.0 });
        let neighbour = rail.emphasis(4, 150.0);
        assert!(neighbour.scale < 1.0 && neighbour.opacity < 1.0);
        let far = rail.emphasis(90, 150.0);
        assert_eq!(far, Emphasis { scale: 0.7, opacity: 0.25 });
    }

    #[test]
    fn small_pointer_travel_is_a_press() {
        let mut state = PickerState::new(rail(), 10);
        state.begin_drag(100.0);
        assert!(!state.drag_to(102.0));
        assert_eq!(state.end_drag(), Some(GestureEnd::Press));
        assert_eq!(state.offset(), 500.0);
    }

    #[test]
    fn drag_moves_rail_opposite_to_pointer() {
        let mut state = PickerState::new(rail(), 10);
        state.begin_drag(200.0);
        assert!(state.drag_to(140.0));
        assert_eq!(state.offset(), 560.0);
        assert_eq!(state.highlighted(), 11);
        assert_eq!(state.end_drag(), Some(GestureEnd::Settle(11)));
        assert!(!state.in_gesture());
    }

    #[test]
    fn drag_is_clamped_to_rail() {
        let mut state = PickerState::new(rail(), 0);
        state.begin_drag(0.0);
        state.drag_to(300.0);
        assert_eq!(state.offset(), 0.0);
        state.drag_to(-99_999.0);
        assert_eq!(state.offset(), rail().max_offset());
    }

    #[test]
    fn scroll_echo_of_current_offset_is_ignored() {
        let mut state = PickerState::new(rail(), 4);
        let before = state.revision();
        assert!(!state.scroll_to(200.2));
        assert!(!state.is_scrolling());
        assert_eq!(state.revision(), before);
    }

    #[test]
    fn scroll_during_drag_is_an_echo() {
        let mut state = PickerState::new(rail(), 4);
        state.begin_drag(100.0);
        state.drag_to(60.0);
        assert!(!state.scroll_to(241.0));
        assert!(!state.is_scrolling());
        assert_eq!(state.offset(), 240.0);
    }

    proptest! {
        #[test]
        fn nearest_slot_is_never_farther_than_half_an_item(offset in 0.0f64..4950.0) {
            let rail = rail();
            let slot = rail.nearest_slot(offset);
            prop_assert!((rail.offset_of(slot) - offset).abs() <= 25.0);
        }

        #[test]
        fn settled_offsets_map_back_to_their_slot(slot in 0usize..100) {
            let rail = rail();
            prop_assert_eq!(rail.nearest_slot(rail.offset_of(slot)), slot);
        }
    }
}
