//! Synchronous mission event dispatch.
//!
//! Each mission owns one [`EventDispatcher`]. Handlers run inline, in
//! subscription order, on the thread that publishes.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use serde::Serialize;

use crate::core::planner::Plan;
use crate::core::types::{AgentId, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskSelected,
    PlanUpdated,
    MissionComplete,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::TaskSelected,
        EventKind::PlanUpdated,
        EventKind::MissionComplete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TaskSelected => "task_selected",
            EventKind::PlanUpdated => "plan_updated",
            EventKind::MissionComplete => "mission_complete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MissionEvent {
    TaskSelected { agent: AgentId, task: Task },
    PlanUpdated { agent: AgentId, plan: Plan },
    MissionComplete { agent: AgentId },
}

impl MissionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MissionEvent::TaskSelected { .. } => EventKind::TaskSelected,
            MissionEvent::PlanUpdated { .. } => EventKind::PlanUpdated,
            MissionEvent::MissionComplete { .. } => EventKind::MissionComplete,
        }
    }
}

type Handler = Box<dyn FnMut(&MissionEvent) + Send>;

#[derive(Default)]
pub struct EventDispatcher {
    handlers: BTreeMap<EventKind, Vec<Handler>>,
    published: u64,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field(
                "handlers",
                &self
                    .handlers
                    .iter()
                    .map(|(kind, handlers)| (kind.as_str(), handlers.len()))
                    .collect::<Vec<_>>(),
            )
            .field("published", &self.published)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&MissionEvent) + Send + 'static,
    ) {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Subscribe by event name (`task_selected`, `plan_updated`, `mission_complete`).
    pub fn subscribe_named(
        &mut self,
        name: &str,
        handler: impl FnMut(&MissionEvent) + Send + 'static,
    ) -> Result<()> {
        let kind = EventKind::from_name(name).ok_or_else(|| anyhow!("unknown event '{name}'"))?;
        self.subscribe(kind, handler);
        Ok(())
    }

    pub fn publish(&mut self, event: MissionEvent) {
        self.published += 1;
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for handler in handlers.iter_mut() {
                handler(&event);
            }
        }
    }

    /// Events published so far, including those nobody listened to.
    pub fn published(&self) -> u64 {
        self.published
    }
}
