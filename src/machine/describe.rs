//! Serializable snapshot of a machine's declared structure.

use crate::core::TransitionDescription;
use crate::machine::child::ChildStateMachine;
use serde::{Deserialize, Serialize};

/// A state and its outgoing transitions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateDescription {
    pub name: String,
    /// Groups the state belongs to, in join order
    pub groups: Vec<String>,
    /// Transitions in resolution order
    pub transitions: Vec<TransitionDescription>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupDescription {
    pub name: String,
    pub members: Vec<String>,
}

/// Structure and position of a state machine at the time it was described.
///
/// # Example
///
/// ```rust
/// use hsm_core::{Event, StateMachine};
///
/// let machine = StateMachine::new("door");
/// let closed = machine.create_initial_state("Closed").unwrap();
/// let open = machine.create_state("Open");
/// let toggle = Event::new("Toggle");
/// closed.transition_on(&toggle).to(&open).unwrap();
///
/// let description = machine.describe();
/// assert_eq!(description.initial_state.as_deref(), Some("Closed"));
/// assert_eq!(description.states.len(), 2);
/// assert_eq!(description.states[0].transitions[0].to.as_deref(), Some("Open"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineDescription {
    pub name: String,
    pub initial_state: Option<String>,
    pub current_state: Option<String>,
    pub faulted: bool,
    pub states: Vec<StateDescription>,
    pub groups: Vec<GroupDescription>,
}

impl MachineDescription {
    pub(crate) fn capture(name: &str, child: &ChildStateMachine, faulted: bool) -> Self {
        let state_name = |id| child.state(id).name.to_string();

        let states = child
            .state_ids()
            .map(|id| {
                let record = child.state(id);
                StateDescription {
                    name: record.name.to_string(),
                    groups: record
                        .groups
                        .iter()
                        .map(|&group| child.group(group).name.to_string())
                        .collect(),
                    transitions: record
                        .transitions
                        .iter()
                        .map(|transition| transition.describe(child))
                        .collect(),
                }
            })
            .collect();

        let groups = child
            .group_ids()
            .map(|id| {
                let record = child.group(id);
                GroupDescription {
                    name: record.name.to_string(),
                    members: record.members.iter().map(|&m| state_name(m)).collect(),
                }
            })
            .collect();

        Self {
            name: name.to_string(),
            initial_state: child.initial().map(state_name),
            current_state: child.current().map(state_name),
            faulted,
            states,
            groups,
        }
    }
}
