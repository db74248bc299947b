//! State groups: named sets of states sharing entry/exit handlers.
//!
//! A group's entry handler runs when the machine moves from a state outside
//! the group to a state inside it, and its exit handler on the opposite
//! crossing. Moving between two members fires neither.

use crate::builder::BuildError;
use crate::core::handler::{HandlerResult, StateHandler, StateHandlerInfo};
use crate::core::state::{State, StateId};
use crate::machine::MachineShared;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Index of a group in its machine's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GroupId(pub(crate) usize);

/// Arena record for a group.
pub(crate) struct GroupRecord {
    pub(crate) name: Arc<str>,
    pub(crate) members: Vec<StateId>,
    pub(crate) entry: Option<StateHandler>,
    pub(crate) exit: Option<StateHandler>,
}

impl GroupRecord {
    pub(crate) fn new(name: Arc<str>) -> Self {
        Self {
            name,
            members: Vec::new(),
            entry: None,
            exit: None,
        }
    }
}

/// Handle to a state group owned by a [`StateMachine`](crate::StateMachine).
#[derive(Clone)]
pub struct StateGroup {
    id: GroupId,
    name: Arc<str>,
    machine_id: Uuid,
    machine: Weak<MachineShared>,
}

impl StateGroup {
    pub(crate) fn new(
        id: GroupId,
        name: Arc<str>,
        machine_id: Uuid,
        machine: Weak<MachineShared>,
    ) -> Self {
        Self {
            id,
            name,
            machine_id,
            machine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add `state` to this group. Adding a member twice has no effect.
    pub fn add_state(&self, state: &State) -> Result<(), BuildError> {
        if state.machine_id() != self.machine_id {
            return Err(BuildError::InvalidGroup {
                group: self.name.to_string(),
                state: state.name().to_string(),
            });
        }
        let machine = self.machine.upgrade().ok_or(BuildError::MachineDropped)?;
        machine
            .inner
            .lock()
            .child
            .add_membership(state.id(), self.id);
        Ok(())
    }

    pub fn add_states<'s, I>(&self, states: I) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = &'s State>,
    {
        states.into_iter().try_for_each(|state| self.add_state(state))
    }

    /// Set the handler run when the machine enters this group.
    pub fn with_entry<F>(&self, handler: F) -> &Self
    where
        F: Fn(&StateHandlerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: StateHandler = Arc::new(handler);
        if let Some(machine) = self.machine.upgrade() {
            machine.inner.lock().child.group_mut(self.id).entry = Some(handler);
        }
        self
    }

    /// Set the handler run when the machine leaves this group.
    pub fn with_exit<F>(&self, handler: F) -> &Self
    where
        F: Fn(&StateHandlerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: StateHandler = Arc::new(handler);
        if let Some(machine) = self.machine.upgrade() {
            machine.inner.lock().child.group_mut(self.id).exit = Some(handler);
        }
        self
    }

    /// Member states, in the order they were added.
    pub fn members(&self) -> Vec<State> {
        let Some(machine) = self.machine.upgrade() else {
            return Vec::new();
        };
        let inner = machine.inner.lock();
        inner
            .child
            .group(self.id)
            .members
            .iter()
            .map(|&id| machine.state_handle(&inner.child, id))
            .collect()
    }

    /// Whether `state` is a member of this group.
    pub fn contains(&self, state: &State) -> bool {
        self.members().contains(state)
    }
}

impl PartialEq for StateGroup {
    fn eq(&self, other: &Self) -> bool {
        self.machine_id == other.machine_id && self.id == other.id
    }
}

impl Eq for StateGroup {}

impl fmt::Debug for StateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateGroup").field(&&*self.name).finish()
    }
}

impl fmt::Display for StateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
