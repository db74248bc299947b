//! One level of the state hierarchy: the arena of states and groups plus
//! the initial and current state.

use crate::builder::BuildError;
use crate::core::{GroupId, GroupRecord, StateId, StateRecord, TransitionRecord};
use uuid::Uuid;

pub(crate) struct ChildStateMachine {
    states: Vec<StateRecord>,
    groups: Vec<GroupRecord>,
    initial: Option<StateId>,
    current: Option<StateId>,
}

impl ChildStateMachine {
    pub(crate) fn new() -> Self {
        Self {
            states: Vec::new(),
            groups: Vec::new(),
            initial: None,
            current: None,
        }
    }

    pub(crate) fn add_state(&mut self, record: StateRecord) -> StateId {
        self.states.push(record);
        StateId(self.states.len() - 1)
    }

    /// Set-once: adds the state and makes it both the initial and the
    /// current state. Nothing is added when an initial state already exists.
    pub(crate) fn add_initial_state(&mut self, record: StateRecord) -> Result<StateId, BuildError> {
        if let Some(existing) = self.initial {
            return Err(BuildError::InitialStateAlreadySet {
                existing: self.state(existing).name.to_string(),
            });
        }
        let id = self.add_state(record);
        self.initial = Some(id);
        self.current = Some(id);
        Ok(id)
    }

    pub(crate) fn add_group(&mut self, record: GroupRecord) -> GroupId {
        self.groups.push(record);
        GroupId(self.groups.len() - 1)
    }

    pub(crate) fn state(&self, id: StateId) -> &StateRecord {
        &self.states[id.0]
    }

    pub(crate) fn state_mut(&mut self, id: StateId) -> &mut StateRecord {
        &mut self.states[id.0]
    }

    pub(crate) fn group(&self, id: GroupId) -> &GroupRecord {
        &self.groups[id.0]
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> &mut GroupRecord {
        &mut self.groups[id.0]
    }

    pub(crate) fn state_ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len()).map(StateId)
    }

    pub(crate) fn group_ids(&self) -> impl Iterator<Item = GroupId> {
        (0..self.groups.len()).map(GroupId)
    }

    pub(crate) fn initial(&self) -> Option<StateId> {
        self.initial
    }

    pub(crate) fn current(&self) -> Option<StateId> {
        self.current
    }

    pub(crate) fn set_current(&mut self, id: StateId) {
        self.current = Some(id);
    }

    /// Return to the initial state without running any handler.
    pub(crate) fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Check the (state, event) registration invariant: an unconditional
    /// transition or ignore must be the last registration for its event.
    pub(crate) fn check_registration(
        &self,
        state: StateId,
        event: Uuid,
    ) -> Result<(), BuildError> {
        let record = self.state(state);
        let blocked = record
            .transitions
            .iter()
            .filter(|t| t.event.id() == event)
            .find(|t| !t.is_conditional());
        match blocked {
            Some(existing) => Err(BuildError::UnconditionalTransitionNotLast {
                state: record.name.to_string(),
                event: existing.event.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Append a transition to `state`'s list, returning its index.
    pub(crate) fn push_transition(&mut self, state: StateId, record: TransitionRecord) -> usize {
        let transitions = &mut self.state_mut(state).transitions;
        transitions.push(record);
        transitions.len() - 1
    }

    /// Transitions of `state` registered against `event`, in resolution order.
    pub(crate) fn candidates(&self, state: StateId, event: Uuid) -> Vec<TransitionRecord> {
        self.state(state)
            .transitions
            .iter()
            .filter(|t| t.event.id() == event)
            .cloned()
            .collect()
    }

    /// Idempotent membership update on both sides.
    pub(crate) fn add_membership(&mut self, state: StateId, group: GroupId) {
        let groups = &mut self.states[state.0].groups;
        if !groups.contains(&group) {
            groups.push(group);
        }
        let members = &mut self.groups[group.0].members;
        if !members.contains(&state) {
            members.push(state);
        }
    }
}
