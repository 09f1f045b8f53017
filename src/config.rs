//! Application-level configuration constants.

// Picker geometry
pub const ITEM_HEIGHT_PX: f64 = 50.0;
pub const PANEL_HEIGHT_PX: u32 = 250;
pub const PANEL_HEIGHT_TIMER_PX: u32 = 100;

// UI Behavior
pub const SNAP_DEBOUNCE_MS: u32 = 150;
pub const HAPTIC_PULSE_MS: u32 = 10;
pub const TICK_MS: u32 = 50;
pub const SLIDE_TRANSITION_MS: u32 = 400;
pub const RESET_TRANSITION_MS: u32 = 300;
/// Fraction of the slide track the knob must pass before release starts the timer.
pub const SLIDE_TRIGGER_FRACTION: f64 = 0.7;
pub const SLIDE_KNOB_PX: f64 = 80.0;
/// Pointer travel below this is still a press, not a drag.
pub const DRAG_SLOP_PX: f64 = 4.0;

// Default values for the pickers
pub const DEFAULT_COFFEE_G: u32 = 20;
pub const DEFAULT_RATIO: u32 = 15;
pub const DEFAULT_WATER_ML: u32 = 300;

// Min/Max limits for the pickers
pub const MIN_COFFEE_G: u32 = 1;
pub const MAX_COFFEE_G: u32 = 100;
pub const MIN_RATIO: u32 = 1;
pub const MAX_RATIO: u32 = 50;
pub const MIN_WATER_ML: u32 = 50;
pub const MAX_WATER_ML: u32 = 2000;

// Offline cache
pub const SERVICE_WORKER_SCRIPT: &str = "./sw.js";
pub const CACHE_NAME: &str = "calc-coffee-v1";
pub const PRECACHE_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./styles.css",
    "./calc_coffee.js",
    "./calc_coffee_bg.wasm",
    "./sw.js",
    "./sw_bg.wasm",
    "./manifest.json",
    "./logo.svg",
    "./icon-coffee.svg",
    "./icon-gear.svg",
    "./icon-water.svg",
    "./icon-timer.svg",
    "./icon-play.svg",
    "./icon-pause.svg",
    "./icon-reset.svg",
    "./icon-192.png",
    "./icon-512.png",
];
