//! Transition requests, disposal policy, opaque state parameters, and
//! checkpoint value types.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::id::TickId;

/// When the outgoing state's cleanup callbacks run relative to a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Disposal {
    /// Dispose the outgoing instance at the moment the transition is
    /// recorded, even if the swap itself is delayed.
    Immediate,
    /// Dispose the outgoing instance when the swap is performed.
    #[default]
    Delayed,
    /// Defer disposal until the first tick after an unpause. Used by
    /// states that pause the simulation and must not run teardown while
    /// the world is frozen.
    AfterResume,
}

/// Opaque, cheaply clonable parameter value handed to a state constructor.
///
/// Cloning shares the underlying value, which is what makes transitions
/// (and therefore checkpoints) clonable and replayable.
#[derive(Clone)]
pub struct Params(Rc<dyn Any>);

impl Params {
    /// Wrap a value.
    pub fn new<T: 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// The empty parameter value, for states that take none.
    pub fn none() -> Self {
        Self(Rc::new(()))
    }

    /// Borrow the wrapped value if it has type `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Params(..)")
    }
}

/// A request to replace the active state.
///
/// Produced at most once per execution of a context via the `next` or
/// `restore` hooks; the engine classifies it into an immediate swap, a
/// soft refresh, a delayed swap, or a pause-aware deferred swap.
#[derive(Clone, Debug)]
pub struct Transition {
    /// Registered name of the target state.
    pub to: String,
    /// Opaque constructor parameters for the target state.
    pub params: Params,
    /// Number of ticks to wait before performing the swap. 0 = this tick.
    pub wait: u32,
    /// Disposal policy for the outgoing instance.
    pub disposal: Disposal,
}

impl Transition {
    /// A transition to `name` with empty params, no wait, and the
    /// default ([`Disposal::Delayed`]) disposal policy.
    pub fn to(name: impl Into<String>) -> Self {
        Self {
            to: name.into(),
            params: Params::none(),
            wait: 0,
            disposal: Disposal::default(),
        }
    }

    /// Replace the constructor parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Delay the swap by `ticks` ticks.
    pub fn after(mut self, ticks: u32) -> Self {
        self.wait = ticks;
        self
    }

    /// Override the disposal policy.
    pub fn with_disposal(mut self, disposal: Disposal) -> Self {
        self.disposal = disposal;
        self
    }
}

/// A transition draft registered during a state's execution.
///
/// Not yet durable: drafts accumulate on the owning state instance and
/// are promoted to [`Checkpoint`]s when that instance transitions away,
/// or discarded when the machine stops.
#[derive(Clone, Debug)]
pub struct CheckpointDraft {
    /// Optional lookup key for targeted restores.
    pub key: Option<String>,
    /// The transition to replay when restored.
    pub transition: Transition,
}

/// A durably recorded transition replayable via the `restore` hook.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    /// Optional lookup key, carried over from the draft.
    pub key: Option<String>,
    /// The transition to replay.
    pub transition: Transition,
    /// Name of the state that registered the draft.
    pub state: String,
    /// Tick at which the draft was promoted.
    pub tick: TickId,
}

/// A request to resolve a recorded checkpoint.
#[derive(Clone, Debug, Default)]
pub struct RestoreRequest {
    /// Resolve the most recent checkpoint with this key; `None` resolves
    /// the most recent checkpoint overall.
    pub key: Option<String>,
    /// Remove the resolved checkpoint from the store.
    pub consume: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_defaults() {
        let t = Transition::to("kickoff");
        assert_eq!(t.to, "kickoff");
        assert_eq!(t.wait, 0);
        assert_eq!(t.disposal, Disposal::Delayed);
    }

    #[test]
    fn transition_builders_compose() {
        let t = Transition::to("snap")
            .with_params(Params::new(3u32))
            .after(2)
            .with_disposal(Disposal::Immediate);
        assert_eq!(t.wait, 2);
        assert_eq!(t.disposal, Disposal::Immediate);
        assert_eq!(t.params.downcast_ref::<u32>(), Some(&3));
    }

    #[test]
    fn params_downcast_by_type() {
        let p = Params::new(String::from("hut"));
        assert_eq!(p.downcast_ref::<String>().map(String::as_str), Some("hut"));
        assert!(p.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn params_clone_shares_value() {
        let p = Params::new(41u64);
        let q = p.clone();
        assert_eq!(q.downcast_ref::<u64>(), Some(&41));
    }
}
