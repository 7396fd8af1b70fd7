//! The capability set the renderer needs from a task.

use std::sync::Arc;

/// Lifecycle of a task node.
///
/// `Pending -> Running -> {Completed | Failed | Skipped}`. A node still
/// running when its render ends is drawn as interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// Change notifications a node emits to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    State(TaskState),
    Title(String),
    Output(String),
    SubtaskAdded,
}

impl TaskEvent {
    /// Whether the event finishes a node.
    #[must_use]
    pub fn is_settling(&self) -> bool {
        matches!(self, Self::State(state) if state.is_terminal())
    }
}

pub type TaskListener = Arc<dyn Fn(&TaskEvent) + Send + Sync>;

/// Handle returned by [`TaskNode::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A renderable task.
///
/// Any execution engine can drive the renderer by implementing this trait;
/// the renderer only reads state and listens for events.
pub trait TaskNode: Send + Sync {
    fn title(&self) -> String;

    fn set_title(&self, title: &str);

    /// Disabled nodes are not rendered at all.
    fn is_enabled(&self) -> bool;

    fn is_started(&self) -> bool;

    fn is_completed(&self) -> bool;

    fn has_failed(&self) -> bool;

    fn is_skipped(&self) -> bool;

    /// Reason shown after a skipped title as `title -> reason`.
    fn skip_reason(&self) -> Option<String> {
        None
    }

    /// Captured output, possibly multi-line.
    fn output(&self) -> Option<String>;

    fn subtasks(&self) -> Vec<Arc<dyn TaskNode>>;

    fn subscribe(&self, listener: TaskListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Started and not yet finished.
    fn is_running(&self) -> bool {
        self.is_started() && !self.is_completed() && !self.has_failed() && !self.is_skipped()
    }
}
