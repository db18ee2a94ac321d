use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::node::NodeId;
use crate::tree::Dom;

/// A named notification dispatched on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    /// The element the event was triggered on.
    pub target: NodeId,
    /// The element whose listener is currently running.
    pub current_target: NodeId,
}

pub type Listener = Rc<dyn Fn(&Event)>;

#[derive(Clone, Default)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    fn add(&mut self, node_id: NodeId, event: String, listener: Listener) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
    }

    fn get(&self, node_id: NodeId, event: &str) -> &[Listener] {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl fmt::Debug for ListenerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count: usize = self
            .map
            .values()
            .flat_map(|events| events.values())
            .map(Vec::len)
            .sum();
        f.debug_struct("ListenerStore")
            .field("listeners", &count)
            .finish()
    }
}

impl Dom {
    /// Register a listener for `event` on `node_id`.
    pub fn on(&mut self, node_id: NodeId, event: impl Into<String>, listener: impl Fn(&Event) + 'static) {
        self.listeners.add(node_id, event.into(), Rc::new(listener));
    }

    /// Dispatch `event` on `target`, then bubble it through every ancestor.
    /// Returns how many listeners ran.
    pub fn trigger(&self, target: NodeId, event: &str) -> usize {
        let mut invoked = 0;
        let mut cursor = Some(target);
        while let Some(current) = cursor {
            let listeners = self.listeners.get(current, event);
            if !listeners.is_empty() {
                let dispatched = Event {
                    name: event.to_string(),
                    target,
                    current_target: current,
                };
                for listener in listeners {
                    listener(&dispatched);
                    invoked += 1;
                }
            }
            cursor = self.parent(current);
        }
        invoked
    }
}
