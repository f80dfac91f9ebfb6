// Task store: ordered task list with an injected persistence slot and clock

use crate::clock::Clock;
use crate::error::{TaskField, ValidationError};
use crate::filter::Filter;
use crate::models::{MAX_SEQUENCE_NUMBER, Task, TaskCounts};
use crate::persistence::{Persistence, decode_tasks, encode_tasks};
use tracing::{debug, info, warn};

/// Change notification delivered to subscribers after a command applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created(Task),
    Toggled { sequence_number: u64, completed: bool },
    Deleted(Task),
    FilterChanged(Filter),
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Owns the task list for one session
///
/// Every mutating command rewrites the whole list into the persistence slot.
/// The active filter is session state and is never saved.
///
/// Sequence numbers are never reissued while the store is open. The
/// high-water mark itself is not saved: a new session starts from the
/// highest stored number, so a number deleted from the top of the list in an
/// earlier session (for example by a previous CLI invocation) can come back.
pub struct TaskStore<P: Persistence, C: Clock> {
    tasks: Vec<Task>,
    filter: Filter,
    last_issued: u64,
    persistence: P,
    clock: C,
    listeners: Vec<Listener>,
}

impl<P: Persistence, C: Clock> TaskStore<P, C> {
    /// Load the list from `persistence`
    ///
    /// A missing slot, or one that does not hold a JSON array, starts an
    /// empty list. Opening never fails.
    pub fn open(persistence: P, clock: C) -> Self {
        let tasks = match persistence.load() {
            Ok(Some(payload)) => match decode_tasks(&payload) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(error = ?e, "Stored tasks unreadable, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = ?e, "Failed to load tasks, starting empty");
                Vec::new()
            }
        };

        let last_issued = tasks.iter().map(|t| t.sequence_number).max().unwrap_or(0);
        info!(count = tasks.len(), last_issued, "Opened task store");

        Self {
            tasks,
            filter: Filter::default(),
            last_issued,
            persistence,
            clock,
            listeners: Vec::new(),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Append a new pending task
    ///
    /// Both fields are trimmed; a blank title is reported before a blank
    /// description. Once `MAX_SEQUENCE_NUMBER` has been issued every further
    /// call is rejected. Rejected input leaves the store untouched.
    pub fn create(&mut self, title: &str, description: &str) -> Result<Task, ValidationError> {
        let title = title.trim();
        let description = description.trim();

        if title.is_empty() {
            return Err(ValidationError::empty(TaskField::Title));
        }
        if description.is_empty() {
            return Err(ValidationError::empty(TaskField::Description));
        }

        let sequence_number = self
            .last_issued
            .checked_add(1)
            .filter(|n| *n <= MAX_SEQUENCE_NUMBER)
            .ok_or_else(ValidationError::exhausted)?;

        self.last_issued = sequence_number;
        let task = Task {
            sequence_number,
            title: title.to_string(),
            description: description.to_string(),
            completed: false,
            created_at: self.clock.now(),
        };

        debug!(sno = task.sequence_number, "create: appending task");
        self.tasks.push(task.clone());
        self.persist();
        self.notify(StoreEvent::Created(task.clone()));

        Ok(task)
    }

    /// Flip the completion flag of the task with `sequence_number`
    ///
    /// Unknown numbers are ignored.
    pub fn toggle_complete(&mut self, sequence_number: u64) {
        let toggled = self
            .tasks
            .iter_mut()
            .find(|t| t.sequence_number == sequence_number)
            .map(|task| {
                task.completed = !task.completed;
                task.completed
            });

        self.persist();

        match toggled {
            Some(completed) => {
                debug!(sno = sequence_number, completed, "toggle_complete: flipped");
                self.notify(StoreEvent::Toggled {
                    sequence_number,
                    completed,
                });
            }
            None => debug!(sno = sequence_number, "toggle_complete: no such task"),
        }
    }

    /// Remove the task with `sequence_number`, keeping the order of the rest
    ///
    /// Unknown numbers are ignored. Removed numbers are never issued again.
    pub fn delete(&mut self, sequence_number: u64) {
        let index = self.tasks.iter().position(|t| t.sequence_number == sequence_number);
        let removed = index.map(|i| self.tasks.remove(i));

        self.persist();

        match removed {
            Some(task) => {
                debug!(sno = sequence_number, "delete: removed");
                self.notify(StoreEvent::Deleted(task));
            }
            None => debug!(sno = sequence_number, "delete: no such task"),
        }
    }

    /// Change the active view; not persisted
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.notify(StoreEvent::FilterChanged(filter));
    }

    /// Register a callback run after every applied change
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Tasks matching the active filter, in insertion order
    pub fn filtered_view(&self) -> Vec<&Task> {
        self.filtered_by(self.filter)
    }

    /// Tasks matching `filter`, in insertion order
    pub fn filtered_by(&self, filter: Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn counts(&self) -> TaskCounts {
        TaskCounts::from_tasks(&self.tasks)
    }

    pub fn get(&self, sequence_number: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.sequence_number == sequence_number)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Write the whole list to the slot; failures are logged, not returned
    fn persist(&mut self) {
        let result = encode_tasks(&self.tasks).and_then(|payload| self.persistence.save(&payload));

        if let Err(e) = result {
            warn!(error = ?e, count = self.tasks.len(), "Failed to save tasks");
        }
    }

    fn notify(&mut self, event: StoreEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::persistence::MemorySlot;
    use chrono::{DateTime, TimeZone, Utc};
    use eyre::eyre;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 14, 45, 0).unwrap()
    }

    fn new_store() -> TaskStore<MemorySlot, FixedClock> {
        TaskStore::open(MemorySlot::new(), FixedClock(fixed_time()))
    }

    fn saved_tasks(store: &TaskStore<MemorySlot, FixedClock>) -> Vec<Task> {
        let payload = store.persistence().contents().expect("slot written");
        decode_tasks(payload).unwrap()
    }

    fn assert_counts_consistent(store: &TaskStore<MemorySlot, FixedClock>) {
        let counts = store.counts();
        assert_eq!(counts.total, counts.completed + counts.pending);
        assert_eq!(counts.total, store.tasks().len());
    }

    /// Slot whose writes always fail
    struct BrokenSlot;

    impl Persistence for BrokenSlot {
        fn load(&self) -> eyre::Result<Option<String>> {
            Err(eyre!("disk unavailable"))
        }

        fn save(&mut self, _payload: &str) -> eyre::Result<()> {
            Err(eyre!("disk unavailable"))
        }
    }

    #[test]
    fn test_open_empty_slot() {
        let store = new_store();
        assert!(store.tasks().is_empty());
        assert_eq!(store.filter(), Filter::All);
        assert_eq!(store.counts(), TaskCounts::default());
        // Opening alone writes nothing
        assert!(store.persistence().contents().is_none());
    }

    #[test]
    fn test_open_corrupt_slot_starts_empty() {
        let store = TaskStore::open(MemorySlot::with_payload("{corrupt"), FixedClock(fixed_time()));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn test_open_failing_slot_starts_empty() {
        let mut store = TaskStore::open(BrokenSlot, FixedClock(fixed_time()));
        assert!(store.tasks().is_empty());

        // Save failures do not surface to the caller
        let task = store.create("Still works", "in memory").unwrap();
        assert_eq!(task.sequence_number, 1);
        store.toggle_complete(1);
        assert!(store.get(1).unwrap().completed);
    }

    #[test]
    fn test_create_appends_pending_task() {
        let mut store = new_store();

        let task = store.create("  Buy milk ", "\t2% milk\n").unwrap();
        assert_eq!(task.sequence_number, 1);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "2% milk");
        assert!(!task.completed);
        assert_eq!(task.created_at, fixed_time());

        assert_eq!(store.filtered_view(), vec![&task]);
        assert_eq!(saved_tasks(&store), vec![task]);
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        let mut store = new_store();
        store.create("Keep", "me").unwrap();
        let before = store.persistence().contents().map(str::to_string);

        assert_eq!(
            store.create("", "x").unwrap_err(),
            ValidationError::empty(TaskField::Title)
        );
        assert_eq!(
            store.create("x", "").unwrap_err(),
            ValidationError::empty(TaskField::Description)
        );
        assert_eq!(
            store.create("  ", "  ").unwrap_err(),
            ValidationError::empty(TaskField::Title)
        );

        assert_eq!(store.counts().total, 1);
        assert_eq!(store.persistence().contents().map(str::to_string), before);

        // A rejected create does not consume a sequence number
        assert_eq!(store.create("Next", "one").unwrap().sequence_number, 2);
    }

    #[test]
    fn test_sequence_numbers_never_reused() {
        let mut store = new_store();
        for i in 1..=3 {
            store.create(&format!("Task {}", i), "body").unwrap();
        }

        store.delete(2);
        assert_eq!(store.create("Four", "body").unwrap().sequence_number, 4);

        // Removing the highest number does not free it either
        store.delete(4);
        assert_eq!(store.create("Five", "body").unwrap().sequence_number, 5);

        let numbers: Vec<u64> = store.tasks().iter().map(|t| t.sequence_number).collect();
        assert_eq!(numbers, vec![1, 3, 5]);
    }

    #[test]
    fn test_sequence_continues_after_reload() {
        let payload = r#"[
            {"sno":2,"title":"a","desc":"b","completed":false,"createdAt":"2024-01-01T00:00:00Z"},
            {"sno":7,"title":"c","desc":"d","completed":true,"createdAt":"2024-01-01T00:00:00Z"}
        ]"#;
        let mut store = TaskStore::open(MemorySlot::with_payload(payload), FixedClock(fixed_time()));

        assert_eq!(store.counts().total, 2);
        assert_eq!(store.create("e", "f").unwrap().sequence_number, 8);
    }

    #[test]
    fn test_create_at_sequence_ceiling() {
        let payload = format!(
            r#"[{{"sno":{},"title":"Last","desc":"one","completed":false,"createdAt":"2024-01-01T00:00:00Z"}}]"#,
            MAX_SEQUENCE_NUMBER
        );
        let mut store = TaskStore::open(MemorySlot::with_payload(payload.clone()), FixedClock(fixed_time()));
        assert_eq!(store.counts().total, 1);

        assert_eq!(store.create("x", "y").unwrap_err(), ValidationError::exhausted());
        assert_eq!(store.counts().total, 1);
        assert_eq!(store.persistence().contents(), Some(payload.as_str()));

        // Blank input is still reported first
        assert_eq!(
            store.create("", "y").unwrap_err(),
            ValidationError::empty(TaskField::Title)
        );
    }

    #[test]
    fn test_stored_number_beyond_ceiling_is_dropped() {
        let payload = format!(
            r#"[
                {{"sno":3,"title":"Kept","desc":"one","completed":false,"createdAt":"2024-01-01T00:00:00Z"}},
                {{"sno":{},"title":"Huge","desc":"two","completed":false,"createdAt":"2024-01-01T00:00:00Z"}}
            ]"#,
            u64::MAX
        );
        let mut store = TaskStore::open(MemorySlot::with_payload(payload), FixedClock(fixed_time()));

        assert_eq!(store.counts().total, 1);
        let task = store.create("x", "y").unwrap();
        assert_eq!(task.sequence_number, 4);
    }

    #[test]
    fn test_toggle_twice_restores_flag() {
        let mut store = new_store();
        store.create("Toggle", "me").unwrap();

        store.toggle_complete(1);
        assert!(store.get(1).unwrap().completed);
        assert!(saved_tasks(&store)[0].completed);

        store.toggle_complete(1);
        assert!(!store.get(1).unwrap().completed);
        assert!(!saved_tasks(&store)[0].completed);
    }

    #[test]
    fn test_toggle_and_delete_unknown_are_noops() {
        let mut store = new_store();
        store.create("Only", "task").unwrap();
        let before = store.tasks().to_vec();

        store.toggle_complete(42);
        store.delete(42);

        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(saved_tasks(&store), before);
    }

    #[test]
    fn test_delete_preserves_order() {
        let mut store = new_store();
        for title in ["a", "b", "c", "d"] {
            store.create(title, "body").unwrap();
        }

        store.delete(2);

        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "d"]);
        assert_eq!(saved_tasks(&store).len(), 3);
    }

    #[test]
    fn test_set_filter_does_not_persist() {
        let mut store = new_store();
        store.create("a", "b").unwrap();
        let before = store.persistence().contents().map(str::to_string);

        store.set_filter(Filter::Completed);

        assert_eq!(store.filter(), Filter::Completed);
        assert_eq!(store.persistence().contents().map(str::to_string), before);
    }

    #[test]
    fn test_filtered_views() {
        let mut store = new_store();
        for title in ["a", "b", "c"] {
            store.create(title, "body").unwrap();
        }
        store.toggle_complete(1);
        store.toggle_complete(3);

        let titles = |tasks: Vec<&Task>| tasks.iter().map(|t| t.title.clone()).collect::<Vec<_>>();

        assert_eq!(titles(store.filtered_view()), vec!["a", "b", "c"]);

        store.set_filter(Filter::Completed);
        assert_eq!(titles(store.filtered_view()), vec!["a", "c"]);

        store.set_filter(Filter::Pending);
        assert_eq!(titles(store.filtered_view()), vec!["b"]);

        // The projection leaves the list alone
        assert_eq!(store.tasks().len(), 3);
        assert_eq!(titles(store.filtered_by(Filter::All)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_counts_consistent_after_every_operation() {
        let mut store = new_store();
        assert_counts_consistent(&store);

        store.create("a", "1").unwrap();
        assert_counts_consistent(&store);
        store.create("b", "2").unwrap();
        assert_counts_consistent(&store);
        let _ = store.create("", "3");
        assert_counts_consistent(&store);
        store.toggle_complete(2);
        assert_counts_consistent(&store);
        store.toggle_complete(9);
        assert_counts_consistent(&store);
        store.set_filter(Filter::Pending);
        assert_counts_consistent(&store);
        store.delete(1);
        assert_counts_consistent(&store);

        assert_eq!(
            store.counts(),
            TaskCounts {
                total: 1,
                completed: 1,
                pending: 0
            }
        );
    }

    #[test]
    fn test_buy_milk_scenario() {
        let mut store = new_store();

        store.create("Buy milk", "2% milk").unwrap();
        store.create("Pay bills", "electric").unwrap();
        store.toggle_complete(1);
        store.set_filter(Filter::Completed);

        let view = store.filtered_view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].sequence_number, 1);
        assert_eq!(view[0].title, "Buy milk");
        assert!(view[0].completed);

        store.delete(2);
        assert_eq!(
            store.counts(),
            TaskCounts {
                total: 1,
                completed: 1,
                pending: 0
            }
        );
    }

    #[test]
    fn test_reopen_round_trip() {
        let mut store = new_store();
        store.create("Buy milk", "2% milk").unwrap();
        store.create("Pay bills", "electric").unwrap();
        store.toggle_complete(2);
        let expected = store.tasks().to_vec();

        let slot = store.persistence().clone();
        let reopened = TaskStore::open(slot, FixedClock(fixed_time()));
        assert_eq!(reopened.tasks(), expected.as_slice());
        assert_eq!(reopened.filter(), Filter::All);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut store = new_store();

        let sink = Rc::clone(&events);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let task = store.create("a", "b").unwrap();
        let _ = store.create(" ", "b");
        store.toggle_complete(1);
        store.toggle_complete(99);
        store.set_filter(Filter::Pending);
        store.delete(99);
        store.delete(1);

        let mut completed_task = task.clone();
        completed_task.completed = true;

        assert_eq!(
            *events.borrow(),
            vec![
                StoreEvent::Created(task),
                StoreEvent::Toggled {
                    sequence_number: 1,
                    completed: true
                },
                StoreEvent::FilterChanged(Filter::Pending),
                StoreEvent::Deleted(completed_task),
            ]
        );
    }
}
