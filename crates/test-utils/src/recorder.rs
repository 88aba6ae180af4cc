// crates/test-utils/src/recorder.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use buildrig::context::TaskContext;
use buildrig::task::{AsyncFnTask, FnTask, Task};

/// What a recording task did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    End(String),
    /// Free-form marker, e.g. written by a group hook.
    Note(String),
}

/// Shared, ordered log of task events.
///
/// Every task built from the log pushes `Start(label)` when it begins and
/// `End(label)` when it finishes, so tests can assert happens-before
/// relations by comparing positions.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn note(&self, text: impl Into<String>) {
        self.push(Event::Note(text.into()));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e == event)
    }

    pub fn start_of(&self, label: &str) -> usize {
        self.position(&Event::Start(label.to_string()))
            .unwrap_or_else(|| panic!("task '{label}' never started"))
    }

    pub fn end_of(&self, label: &str) -> usize {
        self.position(&Event::End(label.to_string()))
            .unwrap_or_else(|| panic!("task '{label}' never finished"))
    }

    /// How many times `label` started.
    pub fn starts(&self, label: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::Start(l) if l == label))
            .count()
    }

    pub fn has_note(&self, text: &str) -> bool {
        self.position(&Event::Note(text.to_string())).is_some()
    }

    /// Labels in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Start(l) => Some(l.clone()),
                _ => None,
            })
            .collect()
    }

    /// Assert `before` finished before `after` started.
    pub fn assert_finished_before(&self, before: &str, after: &str) {
        let end = self.end_of(before);
        let start = self.start_of(after);
        assert!(
            end < start,
            "expected '{before}' to finish before '{after}' started: {:?}",
            self.events()
        );
    }

    /// Task that records start and end.
    pub fn task(&self, label: &str) -> impl Task {
        self.sleeping_task(label, 0)
    }

    /// Task that blocks its thread for `millis` between start and end.
    pub fn sleeping_task(&self, label: &str, millis: u64) -> impl Task {
        let log = self.clone();
        let name = label.to_string();
        FnTask::new(label, move |_ctx: &TaskContext| {
            log.push(Event::Start(name.clone()));
            if millis > 0 {
                std::thread::sleep(Duration::from_millis(millis));
            }
            log.push(Event::End(name.clone()));
            Ok(())
        })
    }

    /// Native async task that yields to the runtime for `millis`.
    pub fn async_task(&self, label: &str, millis: u64) -> impl Task {
        let log = self.clone();
        let name = label.to_string();
        AsyncFnTask::new(label, move |_ctx: TaskContext| {
            let log = log.clone();
            let name = name.clone();
            async move {
                log.push(Event::Start(name.clone()));
                tokio::time::sleep(Duration::from_millis(millis)).await;
                log.push(Event::End(name));
                Ok(())
            }
        })
    }

    /// Task that records its start and then fails with `message`.
    pub fn failing_task(&self, label: &str, message: &str) -> impl Task {
        let log = self.clone();
        let name = label.to_string();
        let message = message.to_string();
        FnTask::new(label, move |_ctx: &TaskContext| {
            log.push(Event::Start(name.clone()));
            bail!("{message}")
        })
    }

    /// Task that records its start and then panics.
    pub fn panicking_task(&self, label: &str) -> impl Task {
        let log = self.clone();
        let name = label.to_string();
        FnTask::new(label, move |_ctx: &TaskContext| -> anyhow::Result<()> {
            log.push(Event::Start(name.clone()));
            panic!("task '{name}' blew up")
        })
    }
}
