use calc_coffee::browser::{GlooScheduler, NavigatorHaptics, PerformanceClock};
use calc_coffee::{BrewSession, Fired, PickerError, PickerSpec};
use std::cell::RefCell;
use std::rc::Rc;
use yew::prelude::*;

/// Render counter bumped after every mutation of the session.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Revision(u64);

impl Reducible for Revision {
    type Action = ();

    fn reduce(self: Rc<Self>, _: ()) -> Rc<Self> {
        Rc::new(Revision(self.0.wrapping_add(1)))
    }
}

/// Shared access to the session plus a way to re-render after mutating it.
///
/// Handles compare equal whenever they share a session. Components that hold
/// one take the slice of session state they render as separate props.
#[derive(Clone)]
pub struct SessionHandle {
    session: Rc<RefCell<BrewSession>>,
    refresh: UseReducerHandle<Revision>,
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.session, &other.session)
    }
}

impl SessionHandle {
    pub fn read<R>(&self, f: impl FnOnce(&BrewSession) -> R) -> R {
        f(&self.session.borrow())
    }

    /// Mutate the session and schedule a re-render.
    pub fn update<R>(&self, f: impl FnOnce(&mut BrewSession) -> R) -> R {
        let result = f(&mut self.session.borrow_mut());
        self.refresh.dispatch(());
        result
    }
}

/// Custom hook owning the brew session for the lifetime of the component.
///
/// The session is built once on mount. Scheduler callbacks are dispatched into
/// it and trigger a re-render; unmounting drops every armed timer.
#[hook]
pub fn use_brew_session() -> Result<SessionHandle, PickerError> {
    let refresh = use_reducer(Revision::default);
    let scheduler = use_memo((), |_| GlooScheduler::new());

    let session = {
        let scheduler = scheduler.clone();
        use_memo((), move |_| {
            BrewSession::new(
                &PickerSpec::defaults(),
                Rc::new(PerformanceClock::new()),
                scheduler,
                Rc::new(NavigatorHaptics),
            )
            .map(|session| Rc::new(RefCell::new(session)))
        })
    };

    {
        let scheduler = scheduler.clone();
        let session = session.clone();
        let refresh = refresh.clone();
        use_effect_with((), move |_| {
            if let Ok(shared) = &*session {
                let shared = shared.clone();
                scheduler.bind(Callback::from(move |fired: Fired| {
                    shared.borrow_mut().dispatch(fired);
                    refresh.dispatch(());
                }));
            }
            move || {
                scheduler.unbind();
                if let Ok(shared) = &*session {
                    shared.borrow_mut().teardown();
                }
            }
        });
    }

    match &*session {
        Ok(shared) => Ok(SessionHandle {
            session: shared.clone(),
            refresh,
        }),
        Err(err) => Err(err.clone()),
    }
}
