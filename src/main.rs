//! Entry point for the brew calculator using Yew.
//! Wires the session hook to the picker columns and the timer panel.

use calc_coffee::browser::{init_logging, register_service_worker};
use calc_coffee::config::SERVICE_WORKER_SCRIPT;
use calc_coffee::{QuantityKind, TimerLayout};
use log::{error, LevelFilter};
use yew::prelude::*;

mod components;
mod hooks;

use components::{PickerColumn, TimerPanel, TimerView};
use hooks::use_brew_session;

#[function_component]
pub fn App() -> Html {
    let handle = match use_brew_session() {
        Ok(handle) => handle,
        Err(err) => {
            error!("cannot start brew session: {err}");
            return html! {
                <div class="app-error">{ format!("Configuration error: {err}") }</div>
            };
        }
    };

    let timer = TimerView::of(&handle);
    let timer_active = handle.read(|s| s.timer.layout() == TimerLayout::Active);

    html! {
        <main class={classes!("app", timer_active.then_some("timer-active"))}>
            <header class="app-header">
                <img class="logo" src="logo.svg" alt="Coffee ratio" />
            </header>
            <section class="pickers">
                { for QuantityKind::ALL.into_iter().map(|kind| {
                    let (revision, panel_height) = handle.read(|s| {
                        (s.ratio.picker(kind).state().revision(), s.ratio.panel_height())
                    });
                    html! {
                        <PickerColumn
                            key={kind.as_str()}
                            handle={handle.clone()}
                            {kind}
                            {revision}
                            {panel_height}
                        />
                    }
                }) }
            </section>
            <section class="timer">
                <TimerPanel handle={handle.clone()} view={timer} />
            </section>
        </main>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    init_logging(LevelFilter::Info);
    register_service_worker(SERVICE_WORKER_SCRIPT);
    yew::Renderer::<App>::new().render();
}
