//! In-memory tasks and gated task runs.
//!
//! [`Task`] is the concrete [`TaskNode`] the spinner façade drives. A
//! [`TaskRun`] keeps a task in a live render until the paired [`Gate`] is
//! settled, mirroring a task list whose jobs wait on external resolve/reject
//! pairs. Several runs may share one render.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::renderer::{
    RenderSession, SubscriptionId, TaskEvent, TaskListener, TaskNode, TaskRenderer, TaskState,
};

#[derive(Debug)]
struct TaskData {
    title: String,
    state: TaskState,
    skip_reason: Option<String>,
    output: Option<String>,
    enabled: bool,
    subtasks: Vec<Arc<Task>>,
}

/// A task whose state is set by its owner.
///
/// Every mutation notifies subscribers after the task's own lock is released,
/// so listeners may read the task back.
pub struct Task {
    data: Mutex<TaskData>,
    listeners: Mutex<Vec<(SubscriptionId, TaskListener)>>,
    next_id: AtomicU64,
}

impl Task {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(TaskData {
                title: title.into(),
                state: TaskState::Pending,
                skip_reason: None,
                output: None,
                enabled: true,
                subtasks: Vec::new(),
            }),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.data().state
    }

    /// Pending to running. No effect once started.
    pub fn start(&self) {
        let changed = {
            let mut data = self.data();
            let pending = data.state == TaskState::Pending;
            if pending {
                data.state = TaskState::Running;
            }
            pending
        };
        if changed {
            self.emit(&TaskEvent::State(TaskState::Running));
        }
    }

    pub fn complete(&self) {
        self.set_state(TaskState::Completed, None);
    }

    pub fn fail(&self) {
        self.set_state(TaskState::Failed, None);
    }

    /// Skip the task; a reason is shown after its title.
    pub fn skip(&self, reason: Option<&str>) {
        self.set_state(TaskState::Skipped, reason.map(str::to_string));
    }

    /// Replace the captured output.
    pub fn set_output(&self, output: impl Into<String>) {
        let output = output.into();
        self.data().output = Some(output.clone());
        self.emit(&TaskEvent::Output(output));
    }

    pub fn add_subtask(&self, subtask: Arc<Task>) {
        self.data().subtasks.push(subtask);
        self.emit(&TaskEvent::SubtaskAdded);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.data().enabled = enabled;
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    fn set_state(&self, state: TaskState, reason: Option<String>) {
        {
            let mut data = self.data();
            if data.state == state && data.skip_reason == reason {
                return;
            }
            data.state = state;
            data.skip_reason = reason;
        }
        self.emit(&TaskEvent::State(state));
    }

    fn emit(&self, event: &TaskEvent) {
        let listeners: Vec<TaskListener> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn data(&self) -> MutexGuard<'_, TaskData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, TaskListener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskNode for Task {
    fn title(&self) -> String {
        self.data().title.clone()
    }

    fn set_title(&self, title: &str) {
        {
            let mut data = self.data();
            if data.title == title {
                return;
            }
            data.title = title.to_string();
        }
        self.emit(&TaskEvent::Title(title.to_string()));
    }

    fn is_enabled(&self) -> bool {
        self.data().enabled
    }

    fn is_started(&self) -> bool {
        self.data().state != TaskState::Pending
    }

    fn is_completed(&self) -> bool {
        self.data().state == TaskState::Completed
    }

    fn has_failed(&self) -> bool {
        self.data().state == TaskState::Failed
    }

    fn is_skipped(&self) -> bool {
        self.data().state == TaskState::Skipped
    }

    fn skip_reason(&self) -> Option<String> {
        self.data().skip_reason.clone()
    }

    fn output(&self) -> Option<String> {
        self.data().output.clone()
    }

    fn subtasks(&self) -> Vec<Arc<dyn TaskNode>> {
        self.data()
            .subtasks
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn TaskNode>)
            .collect()
    }

    fn subscribe(&self, listener: TaskListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners().retain(|(existing, _)| *existing != id);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data();
        f.debug_struct("Task")
            .field("title", &data.title)
            .field("state", &data.state)
            .finish_non_exhaustive()
    }
}

/// Success verdicts a gate can resolve with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Warn,
    Info,
    /// End quietly, without a success or failure glyph.
    Stop,
}

/// How a task run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Resolved(Verdict),
    Rejected(String),
    /// The gate was dropped unsettled, or the run thread died.
    Abandoned,
}

/// The resolve/reject pair of a [`TaskRun`].
#[derive(Debug)]
pub struct Gate {
    sender: mpsc::Sender<RunOutcome>,
}

impl Gate {
    pub fn resolve(self, verdict: Verdict) {
        // The run only disappears if its thread died; join reports that.
        let _ = self.sender.send(RunOutcome::Resolved(verdict));
    }

    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.sender.send(RunOutcome::Rejected(reason.into()));
    }
}

/// A task being rendered until its gate settles.
#[derive(Debug)]
pub struct TaskRun {
    handle: JoinHandle<RunOutcome>,
}

impl TaskRun {
    /// Start `task` and render it with `renderer` until the gate settles.
    ///
    /// The task is running and the first frame drawn before this returns.
    /// When the gate settles the task is completed, failed or skipped and the
    /// render ends.
    pub fn spawn(task: Arc<Task>, renderer: TaskRenderer) -> io::Result<(Gate, TaskRun)> {
        task.start();
        Self::attach(task, Arc::new(renderer.render()))
    }

    /// Start `task` inside a render shared with other runs.
    ///
    /// The task joins the render's list if it is not there yet. The render
    /// ends once every run holding `session` has ended and its last other
    /// handle is dropped.
    pub fn attach(task: Arc<Task>, session: Arc<RenderSession>) -> io::Result<(Gate, TaskRun)> {
        task.start();
        session.add_task(Arc::clone(&task) as Arc<dyn TaskNode>);

        let (sender, receiver) = mpsc::channel();
        let run_task = Arc::clone(&task);
        let run_session = Arc::clone(&session);
        let spawned = thread::Builder::new()
            .name("logline-task".into())
            .spawn(move || {
                let outcome = receiver.recv().unwrap_or(RunOutcome::Abandoned);
                match &outcome {
                    RunOutcome::Resolved(Verdict::Stop) => run_task.skip(None),
                    RunOutcome::Resolved(_) => run_task.complete(),
                    RunOutcome::Rejected(_) => run_task.fail(),
                    RunOutcome::Abandoned => {}
                }
                drop(run_session);
                outcome
            });

        match spawned {
            Ok(handle) => Ok((Gate { sender }, TaskRun { handle })),
            Err(err) => {
                // Nothing will ever settle the task; keep it off the list.
                task.set_enabled(false);
                session.refresh();
                Err(err)
            }
        }
    }

    /// Wait for the run to end.
    pub fn join(self) -> RunOutcome {
        self.handle.join().unwrap_or(RunOutcome::Abandoned)
    }
}
