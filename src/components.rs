//! Yew view components for the pickers and the timer panel.
//!
//! Components hold no brew state of their own. They read from the shared
//! [`SessionHandle`] and translate DOM events into engine calls. Their props
//! carry just enough of the session to decide when they need to re-render:
//! a picker's own revision for a column, the timer's visible state for the
//! timer panel.

use crate::hooks::SessionHandle;
use calc_coffee::config::DRAG_SLOP_PX;
use calc_coffee::{Emphasis, GestureInput, QuantityKind, TimerDisplay, TimerLayout, TimerState};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Element, ScrollBehavior, ScrollToOptions, WheelEvent};
use yew::prelude::*;

/// Render data for one item on a picker rail.
struct ItemView {
    value: u32,
    emphasis: Emphasis,
    active: bool,
}

/// Render data for one picker column.
struct ColumnView {
    item_height: f64,
    min: u32,
    max: u32,
    value: u32,
    offset: f64,
    smooth: bool,
    scrolling: bool,
    items: Vec<ItemView>,
}

fn column_view(handle: &SessionHandle, kind: QuantityKind) -> ColumnView {
    handle.read(|session| {
        let picker = session.ratio.picker(kind);
        let state = picker.state();
        let quantity = picker.quantity();
        let active = picker.active_slot();
        ColumnView {
            item_height: state.rail().item_height(),
            min: quantity.min(),
            max: quantity.max(),
            value: quantity.value(),
            offset: state.offset(),
            smooth: state.smooth(),
            scrolling: state.is_scrolling(),
            items: picker
                .items()
                .map(|(slot, value)| ItemView {
                    value,
                    emphasis: state.emphasis(slot),
                    active: active == Some(slot),
                })
                .collect(),
        }
    })
}

/// Vertical position of a pointer relative to the top of `node`.
fn panel_y(node: &NodeRef, client_y: i32) -> f64 {
    let top = node
        .cast::<Element>()
        .map(|el| el.get_bounding_client_rect().top())
        .unwrap_or(0.0);
    client_y as f64 - top
}

#[derive(Properties, PartialEq)]
pub struct PickerColumnProps {
    pub handle: SessionHandle,
    pub kind: QuantityKind,
    /// The picker's own revision; timer ticks leave it alone.
    pub revision: u64,
    pub panel_height: u32,
}

/// One scrollable number column.
///
/// Touch input scrolls natively and is committed by the engine's debounce.
/// Mouse input is tracked as a pointer drag. Wheel notches step by one.
#[function_component(PickerColumn)]
pub fn picker_column(props: &PickerColumnProps) -> Html {
    let kind = props.kind;
    let panel_height = props.panel_height;
    let handle = props.handle.clone();
    let viewport = use_node_ref();
    // Set when a mouse drag ends, so the click that follows is not a tap.
    let swallow_click = use_mut_ref(|| false);
    let press_y = use_mut_ref(|| 0.0_f64);

    let view = column_view(&handle, kind);

    // Keep the DOM scroll position on the engine's offset, except while the
    // user is scrolling it natively.
    {
        let viewport = viewport.clone();
        use_effect_with(
            (view.offset.to_bits(), view.smooth, view.scrolling),
            move |&(offset, smooth, scrolling)| {
                let offset = f64::from_bits(offset);
                let Some(el) = viewport.cast::<Element>() else {
                    return;
                };
                if scrolling || (el.scroll_top() as f64 - offset).abs() < 1.0 {
                    return;
                }
                if smooth {
                    let options = ScrollToOptions::new();
                    options.set_top(offset);
                    options.set_behavior(ScrollBehavior::Smooth);
                    el.scroll_to_with_scroll_to_options(&options);
                } else {
                    el.set_scroll_top(offset.round() as i32);
                }
            },
        );
    }

    // Scroll does not bubble and wheel must be non-passive to cancel the
    // page scroll, so both are attached on the element itself.
    {
        let viewport = viewport.clone();
        let handle = handle.clone();
        use_effect_with((), move |_| {
            let listeners = viewport.cast::<Element>().map(|el| {
                let on_wheel = {
                    let handle = handle.clone();
                    Closure::<dyn FnMut(WheelEvent)>::new(move |e: WheelEvent| {
                        e.prevent_default();
                        handle.update(|s| {
                            s.ratio
                                .handle_gesture(kind, GestureInput::Wheel { delta_y: e.delta_y() });
                        });
                    })
                };
                let on_scroll = {
                    let handle = handle.clone();
                    let el = el.clone();
                    Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                        let offset = el.scroll_top() as f64;
                        handle.update(|s| {
                            s.ratio.handle_gesture(kind, GestureInput::Scroll { offset });
                        });
                    })
                };
                let active = AddEventListenerOptions::new();
                active.set_passive(false);
                let _ = el.add_event_listener_with_callback_and_add_event_listener_options(
                    "wheel",
                    on_wheel.as_ref().unchecked_ref(),
                    &active,
                );
                let _ = el.add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref());
                (el, on_wheel, on_scroll)
            });
            move || {
                if let Some((el, on_wheel, on_scroll)) = listeners {
                    let _ = el.remove_event_listener_with_callback("wheel", on_wheel.as_ref().unchecked_ref());
                    let _ = el.remove_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref());
                }
            }
        });
    }

    let onpointerdown = {
        let handle = handle.clone();
        let viewport = viewport.clone();
        let press_y = press_y.clone();
        Callback::from(move |e: PointerEvent| {
            if e.pointer_type() != "mouse" {
                return;
            }
            if let Some(el) = viewport.cast::<Element>() {
                let _ = el.set_pointer_capture(e.pointer_id());
            }
            let y = panel_y(&viewport, e.client_y());
            *press_y.borrow_mut() = y;
            handle.update(|s| {
                s.ratio.handle_gesture(kind, GestureInput::PointerDown { y });
            });
        })
    };

    let onpointermove = {
        let handle = handle.clone();
        let viewport = viewport.clone();
        Callback::from(move |e: PointerEvent| {
            if e.pointer_type() != "mouse" || e.buttons() == 0 {
                return;
            }
            let y = panel_y(&viewport, e.client_y());
            handle.update(|s| {
                s.ratio.handle_gesture(kind, GestureInput::PointerMove { y });
            });
        })
    };

    let onpointerup = {
        let handle = handle.clone();
        let viewport = viewport.clone();
        let press_y = press_y.clone();
        let swallow_click = swallow_click.clone();
        Callback::from(move |e: PointerEvent| {
            if e.pointer_type() != "mouse" {
                return;
            }
            let travel = panel_y(&viewport, e.client_y()) - *press_y.borrow();
            *swallow_click.borrow_mut() = travel.abs() >= DRAG_SLOP_PX;
            handle.update(|s| {
                s.ratio.handle_gesture(kind, GestureInput::PointerUp);
            });
        })
    };

    let onpointercancel = {
        let handle = handle.clone();
        Callback::from(move |_: PointerEvent| {
            handle.update(|s| {
                s.ratio.handle_gesture(kind, GestureInput::PointerCancel);
            });
        })
    };

    // Items carry their value in `data-value`; anything else is background.
    let onclick = {
        let handle = handle.clone();
        let viewport = viewport.clone();
        Callback::from(move |e: MouseEvent| {
            if std::mem::take(&mut *swallow_click.borrow_mut()) {
                return;
            }
            let selected = e
                .target_dyn_into::<Element>()
                .and_then(|el| el.closest("[data-value]").ok().flatten())
                .and_then(|el| el.get_attribute("data-value"))
                .and_then(|raw| raw.parse::<u32>().ok());
            let input = match selected {
                Some(value) => GestureInput::Select { value },
                None => GestureInput::Tap {
                    y: panel_y(&viewport, e.client_y()),
                },
            };
            handle.update(|s| {
                s.ratio.handle_gesture(kind, input);
            });
        })
    };

    let padding = format!(
        "height: {}px",
        (panel_height as f64 / 2.0 - view.item_height / 2.0).max(0.0)
    );

    html! {
        <div class={classes!("number-picker", format!("picker-{}", kind.as_str()))}>
            <div class="picker-label">{ kind.label() }</div>
            <div class="picker-numbers"
                ref={viewport}
                role="spinbutton"
                aria-label={kind.label()}
                aria-valuemin={view.min.to_string()}
                aria-valuemax={view.max.to_string()}
                aria-valuenow={view.value.to_string()}
                style={format!("height: {panel_height}px")}
                {onpointerdown}
                {onpointermove}
                {onpointerup}
                {onpointercancel}
                {onclick}
            >
                <div class="picker-padding" style={padding.clone()} />
                { view.items.iter().map(|item| html! {
                    <div
                        class={classes!("picker-number", item.active.then_some("active"))}
                        data-value={item.value.to_string()}
                        style={format!(
                            "height: {}px; transform: scale({:.3}); opacity: {:.3}",
                            view.item_height, item.emphasis.scale, item.emphasis.opacity
                        )}
                    >
                        { item.value }
                    </div>
                }).collect::<Html>() }
                <div class="picker-padding" style={padding} />
            </div>
        </div>
    }
}

/// What the timer panel shows.
#[derive(Clone, PartialEq)]
pub struct TimerView {
    state: TimerState,
    layout: TimerLayout,
    display: TimerDisplay,
    label: &'static str,
    knob_offset: f64,
    sliding: bool,
}

impl TimerView {
    pub fn of(handle: &SessionHandle) -> Self {
        handle.read(|s| TimerView {
            state: s.timer.state(),
            layout: s.timer.layout(),
            display: s.timer.display(),
            label: s.timer.toggle_label(),
            knob_offset: s.timer.knob_offset(),
            sliding: s.timer.is_sliding(),
        })
    }
}

#[derive(Properties, PartialEq)]
pub struct TimerPanelProps {
    pub handle: SessionHandle,
    pub view: TimerView,
}

/// Slide-to-start track while idle, stopwatch controls once running.
#[function_component(TimerPanel)]
pub fn timer_panel(props: &TimerPanelProps) -> Html {
    let handle = props.handle.clone();
    let track = use_node_ref();
    let knob = use_node_ref();

    let TimerView {
        state,
        layout,
        display,
        label,
        knob_offset,
        sliding,
    } = props.view.clone();

    match layout {
        TimerLayout::Slider => {
            let on_knob_down = {
                let handle = handle.clone();
                let track = track.clone();
                let knob = knob.clone();
                Callback::from(move |e: PointerEvent| {
                    if let Some(el) = knob.cast::<Element>() {
                        let _ = el.set_pointer_capture(e.pointer_id());
                    }
                    let width = track
                        .cast::<Element>()
                        .map(|el| el.get_bounding_client_rect().width())
                        .unwrap_or(0.0);
                    handle.update(|s| s.timer.slide_begin(e.client_x() as f64, width));
                })
            };
            let on_knob_move = {
                let handle = handle.clone();
                Callback::from(move |e: PointerEvent| {
                    if sliding {
                        handle.update(|s| s.timer.slide_move(e.client_x() as f64));
                    }
                })
            };
            let on_knob_up = {
                let handle = handle.clone();
                Callback::from(move |_: PointerEvent| {
                    handle.update(|s| {
                        s.timer.slide_end();
                    });
                })
            };
            // The knob only animates back when released short of the trigger.
            let knob_class = classes!(
                "timer-play-btn",
                sliding.then_some("dragging"),
                (state == TimerState::Transitioning).then_some("sliding")
            );

            html! {
                <div class="timer-slider" ref={track}>
                    <div
                        class={knob_class}
                        ref={knob}
                        style={format!("transform: translateX({knob_offset:.1}px)")}
                        onpointerdown={on_knob_down}
                        onpointermove={on_knob_move}
                        onpointerup={on_knob_up.clone()}
                        onpointercancel={on_knob_up}
                    >
                        <img src="icon-play.svg" alt="Start" />
                    </div>
                    <span class="slider-label">{ "Slide to start" }</span>
                </div>
            }
        }
        TimerLayout::Active => {
            let on_toggle = {
                let handle = handle.clone();
                Callback::from(move |_: MouseEvent| handle.update(|s| s.timer.toggle()))
            };
            let on_reset = {
                let handle = handle.clone();
                Callback::from(move |_: MouseEvent| handle.update(|s| s.timer.reset()))
            };
            let toggle_icon = if state == TimerState::Paused {
                "icon-play.svg"
            } else {
                "icon-pause.svg"
            };

            html! {
                <div class="timer-active">
                    <div class="timer-display">
                        <span class="timer-minutes">{ display.minutes }</span>
                        { ":" }
                        <span class="timer-seconds">{ display.seconds }</span>
                        <span class="timer-centis">{ display.centis }</span>
                    </div>
                    <div class="timer-controls">
                        <button class="timer-reset-btn" onclick={on_reset}>
                            <img src="icon-reset.svg" alt="" />
                            <span>{ "Reset" }</span>
                        </button>
                        <button class="timer-toggle-btn" onclick={on_toggle}>
                            <img src={toggle_icon} alt="" />
                            <span>{ label }</span>
                        </button>
                    </div>
                </div>
            }
        }
    }
}
