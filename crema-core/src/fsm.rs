//! Polled finite-state-machine framework
//!
//! A machine is driven by calling [`StateMachine::run`] once per control
//! tick. During the tick the active state's handler inspects the
//! [`Fsm`] to learn whether it was just entered, whether it is about to
//! be left, how long it has been active and whether a message arrived.
//! Requested transitions take effect when the tick commits, so the
//! handler of the new state first runs on the following tick.
//!
//! ```text
//!   run(now, msg)
//!     begin ──► dispatch(state) ──► commit
//!                 │ on_entry()        previous = current
//!                 │ on_timeout(ms)    current  = next  (entry time = now)
//!                 │ on_message(m)     unconsumed message reported
//!                 │ next(state)
//!                 │ on_exit()
//! ```

use crate::time::time_diff;

/// Per-machine bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fsm<S, M> {
    current: S,
    next: S,
    /// State active during the previous tick; `None` before the first tick
    previous: Option<S>,
    message: Option<M>,
    entered_ms: u32,
    now_ms: u32,
}

impl<S: Copy + Eq, M: Copy + Eq> Fsm<S, M> {
    /// Create a machine resting in `initial`
    pub const fn new(initial: S) -> Self {
        Self {
            current: initial,
            next: initial,
            previous: None,
            message: None,
            entered_ms: 0,
            now_ms: 0,
        }
    }

    /// Active state
    pub fn state(&self) -> S {
        self.current
    }

    /// State active during the previous tick
    pub fn previous(&self) -> Option<S> {
        self.previous
    }

    /// Timestamp of the tick in progress
    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    /// Time since the active state was entered
    pub fn time_in_state(&self) -> u32 {
        time_diff(self.now_ms, self.entered_ms)
    }

    /// Request a transition at the end of this tick
    ///
    /// The last request of a tick wins.
    pub fn next(&mut self, state: S) {
        self.next = state;
    }

    /// True on the first tick after the state became active
    pub fn on_entry(&self) -> bool {
        self.previous != Some(self.current)
    }

    /// True when a transition away has been requested this tick
    pub fn on_exit(&self) -> bool {
        self.next != self.current
    }

    /// True once the state has been active for at least `duration_ms`
    pub fn on_timeout(&self, duration_ms: u32) -> bool {
        self.time_in_state() >= duration_ms
    }

    /// Consume the pending message if it equals `message`
    pub fn on_message(&mut self, message: M) -> bool {
        if self.message == Some(message) {
            self.message = None;
            true
        } else {
            false
        }
    }

    /// Force the machine into `state` without running any handler
    ///
    /// The state is treated as freshly entered on the next tick.
    pub fn reset(&mut self, state: S) {
        self.current = state;
        self.next = state;
        self.previous = None;
        self.message = None;
    }

    /// Open a tick
    pub fn begin(&mut self, now_ms: u32, message: Option<M>) {
        self.now_ms = now_ms;
        self.message = message;
        self.next = self.current;
        if self.previous.is_none() {
            self.entered_ms = now_ms;
        }
    }

    /// Close a tick and apply the requested transition
    ///
    /// Returns the transition taken, if any, and whether a message was
    /// left unconsumed.
    pub fn commit(&mut self) -> (Option<(S, S)>, bool) {
        let unconsumed = self.message.take().is_some();
        self.previous = Some(self.current);

        if self.next == self.current {
            return (None, unconsumed);
        }

        let from = self.current;
        self.current = self.next;
        self.entered_ms = self.now_ms;
        (Some((from, self.current)), unconsumed)
    }
}

/// A machine built on [`Fsm`]
///
/// `C` is the context handed to every state handler for the duration of
/// one tick (devices, settings); machines that own everything they touch
/// use `()`.
pub trait StateMachine<C = ()> {
    /// State enumeration
    type State: Copy + Eq;
    /// Externally posted messages
    type Message: Copy + Eq;

    /// Access the bookkeeping
    fn fsm(&mut self) -> &mut Fsm<Self::State, Self::Message>;

    /// Run the handler of `state`
    fn dispatch(&mut self, state: Self::State, ctx: &mut C);

    /// Called after a transition has been committed
    fn on_transition(&mut self, _from: Self::State, _to: Self::State) {}

    /// Execute one tick
    ///
    /// Returns `true` when `message` was not consumed by the active
    /// state, i.e. the message is not valid there.
    fn run(&mut self, ctx: &mut C, now_ms: u32, message: Option<Self::Message>) -> bool {
        self.fsm().begin(now_ms, message);
        let state = self.fsm().state();
        self.dispatch(state, ctx);

        let (transition, unconsumed) = self.fsm().commit();
        if let Some((from, to)) = transition {
            self.on_transition(from, to);
        }
        unconsumed
    }
}
