//! Synchronous observer subscriptions.
//!
//! Handlers registered via [`World::subscribe`](crate::ecs::world::World::subscribe) run
//! inline, within the same logical tick as the mutation that triggered them - there is no
//! buffering or deferred delivery, unlike [`event::Broker`](crate::ecs::event::Broker)'s
//! double-buffered gameplay events.

use std::collections::HashMap;

use crate::ecs::entity::Entity;
use crate::ecs::world::TypeId;

/// The event kinds a handler can [`subscribe`](Observers::subscribe) to, named the way
/// `World::subscribe` takes them: as a string (`"component_added"`, `"component_removed"`,
/// `"entity_parent_set"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    ComponentAdded,
    ComponentRemoved,
    EntityParentSet,
}

impl Kind {
    fn parse(event_name: &str) -> Option<Self> {
        match event_name {
            "component_added" => Some(Kind::ComponentAdded),
            "component_removed" => Some(Kind::ComponentRemoved),
            "entity_parent_set" => Some(Kind::EntityParentSet),
            _ => None,
        }
    }
}

/// The payload delivered to a handler. Only the fields relevant to the firing [`Kind`] are
/// populated: `component` for the two component events, `parent` for `entity_parent_set`.
#[derive(Debug, Clone, Copy)]
pub struct Notification {
    pub entity: Entity,
    pub component: Option<TypeId>,
    pub parent: Option<Entity>,
}

type Handler = Box<dyn FnMut(&Notification)>;

/// Registry of observer handlers, keyed by the event kind they subscribed to.
#[derive(Default)]
pub struct Observers {
    handlers: HashMap<Kind, Vec<Handler>>,
}

impl Observers {
    /// Register `handler` against `event_name`. Unknown event names are logged and ignored
    /// rather than treated as an error, matching the propagation policy used elsewhere for
    /// operations on state that can't be acted on.
    pub(crate) fn subscribe(&mut self, event_name: &str, handler: Handler) {
        let Some(kind) = Kind::parse(event_name) else {
            log::warn!("subscribe: unknown event '{event_name}', ignoring");
            return;
        };
        self.handlers.entry(kind).or_default().push(handler);
    }

    fn notify(&mut self, kind: Kind, notification: Notification) {
        if let Some(handlers) = self.handlers.get_mut(&kind) {
            for handler in handlers.iter_mut() {
                handler(&notification);
            }
        }
    }

    pub(crate) fn component_added(&mut self, entity: Entity, component: TypeId) {
        self.notify(
            Kind::ComponentAdded,
            Notification {
                entity,
                component: Some(component),
                parent: None,
            },
        );
    }

    pub(crate) fn component_removed(&mut self, entity: Entity, component: TypeId) {
        self.notify(
            Kind::ComponentRemoved,
            Notification {
                entity,
                component: Some(component),
                parent: None,
            },
        );
    }

    pub(crate) fn entity_parent_set(&mut self, entity: Entity, parent: Entity) {
        self.notify(
            Kind::EntityParentSet,
            Notification {
                entity,
                component: None,
                parent: Some(parent),
            },
        );
    }
}
