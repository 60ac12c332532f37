use crate::store::TaskRepository;
use crate::task::{placeholder_tasks, Filter, Task, TaskId, TaskText};
use crate::view::{self, Counts};
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

/// Where the in-memory task list last came from.
///
/// `Store` means the list is exactly what the database returned. After a
/// failed call the list is patched locally and marked `LocalFallback`; the
/// next successful read replaces it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Store,
    LocalFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Could not load tasks from storage. Showing local data.")]
    LoadFailed,
    #[error("Could not save the new task. It is kept locally for now.")]
    CreateFailed,
    #[error("Could not update the task. The change is kept locally for now.")]
    ToggleFailed,
}

#[derive(Debug)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    source: Source,
    last_error: Option<BoardError>,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBoard {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            source: Source::Store,
            last_error: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn last_error(&self) -> Option<BoardError> {
        self.last_error
    }

    pub fn visible(&self, filter: Filter) -> Vec<&Task> {
        view::visible(&self.tasks, filter)
    }

    pub fn counts(&self) -> Counts {
        view::counts(&self.tasks)
    }

    /// Re-reads everything from the store. If nothing has been loaded yet and
    /// the read fails, the placeholder set is shown instead.
    pub fn load<R: TaskRepository + ?Sized>(&mut self, repo: &R) {
        if self.refresh(repo) {
            return;
        }
        if self.tasks.is_empty() {
            self.tasks = placeholder_tasks();
        }
        self.fail(BoardError::LoadFailed);
    }

    pub fn add<R: TaskRepository + ?Sized>(&mut self, repo: &R, text: TaskText) {
        match repo.create(&text) {
            Ok(()) => {
                if !self.refresh(repo) {
                    self.push_local(text);
                    self.fail(BoardError::LoadFailed);
                }
            }
            Err(err) => {
                warn!(error = %err, "create failed, keeping task locally");
                self.push_local(text);
                self.fail(BoardError::CreateFailed);
            }
        }
    }

    pub fn toggle<R: TaskRepository + ?Sized>(&mut self, repo: &R, id: TaskId) {
        match repo.toggle(id) {
            Ok(()) => {
                if !self.refresh(repo) {
                    self.flip_local(id);
                    self.fail(BoardError::LoadFailed);
                }
            }
            Err(err) => {
                warn!(error = %err, %id, "toggle failed, flipping locally");
                self.flip_local(id);
                self.fail(BoardError::ToggleFailed);
            }
        }
    }

    fn refresh<R: TaskRepository + ?Sized>(&mut self, repo: &R) -> bool {
        match repo.read_all() {
            Ok(tasks) => {
                if self.source == Source::LocalFallback {
                    info!(count = tasks.len(), "resynced with storage");
                }
                self.tasks = tasks;
                self.source = Source::Store;
                self.last_error = None;
                true
            }
            Err(err) => {
                warn!(error = %err, "reading tasks failed");
                false
            }
        }
    }

    fn fail(&mut self, error: BoardError) {
        self.source = Source::LocalFallback;
        self.last_error = Some(error);
    }

    fn push_local(&mut self, text: TaskText) {
        let id = self.next_local_id();
        self.tasks.push(Task {
            id,
            text: text.as_str().to_string(),
            done: false,
            created_at: Utc::now(),
        });
    }

    fn flip_local(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.done = !task.done;
        }
    }

    fn next_local_id(&self) -> TaskId {
        let lowest = self.tasks.iter().map(|t| t.id.0).min().unwrap_or(0);
        TaskId(lowest.min(0) - 1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::cell::{Cell, RefCell};

    /// In-memory repository whose reads and writes can be made to fail.
    #[derive(Default)]
    pub(crate) struct FakeRepo {
        pub tasks: RefCell<Vec<Task>>,
        pub fail_reads: Cell<bool>,
        pub fail_writes: Cell<bool>,
        pub blank_engine: Cell<bool>,
        next_id: Cell<i64>,
    }

    fn unavailable() -> StoreError {
        StoreError::Io(std::io::Error::other("store unavailable"))
    }

    impl TaskRepository for FakeRepo {
        fn create(&self, text: &TaskText) -> Result<(), StoreError> {
            if self.fail_writes.get() {
                return Err(unavailable());
            }
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            self.tasks.borrow_mut().push(Task {
                id: TaskId(id),
                text: text.as_str().to_string(),
                done: false,
                created_at: Utc::now(),
            });
            Ok(())
        }

        fn read_all(&self) -> Result<Vec<Task>, StoreError> {
            if self.fail_reads.get() {
                return Err(unavailable());
            }
            Ok(self.tasks.borrow().clone())
        }

        fn toggle(&self, id: TaskId) -> Result<(), StoreError> {
            if self.fail_writes.get() {
                return Err(unavailable());
            }
            if let Some(task) = self.tasks.borrow_mut().iter_mut().find(|t| t.id == id) {
                task.done = !task.done;
            }
            Ok(())
        }

        fn engine_version(&self) -> Result<String, StoreError> {
            if self.fail_reads.get() {
                return Err(unavailable());
            }
            if self.blank_engine.get() {
                return Ok("  ".into());
            }
            Ok("fake-1".into())
        }

        fn schema_version(&self) -> Result<u32, StoreError> {
            if self.fail_reads.get() {
                return Err(unavailable());
            }
            Ok(1)
        }
    }

    fn text(s: &str) -> TaskText {
        TaskText::parse(s).unwrap()
    }

    #[test]
    fn add_grows_by_one_pending_task() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        board.load(&repo);

        for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
            board.add(&repo, text(name));
            assert_eq!(board.tasks().len(), i + 1);
            let added = board.tasks().iter().find(|t| t.text == name).unwrap();
            assert!(!added.done);
        }
        assert_eq!(board.source(), Source::Store);
        assert_eq!(board.last_error(), None);
    }

    #[test]
    fn failed_create_falls_back_locally() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        board.load(&repo);
        repo.fail_writes.set(true);

        board.add(&repo, text("offline"));

        assert_eq!(board.tasks().len(), 1);
        assert!(!board.tasks()[0].done);
        assert!(board.tasks()[0].id.0 < 0);
        assert_eq!(board.last_error(), Some(BoardError::CreateFailed));
        assert_eq!(board.source(), Source::LocalFallback);
        assert!(repo.tasks.borrow().is_empty());
    }

    #[test]
    fn next_success_overwrites_local_state() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        board.load(&repo);
        repo.fail_writes.set(true);
        board.add(&repo, text("lost"));

        repo.fail_writes.set(false);
        board.add(&repo, text("saved"));

        let texts: Vec<_> = board.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["saved"]);
        assert_eq!(board.source(), Source::Store);
        assert_eq!(board.last_error(), None);
    }

    #[test]
    fn toggle_twice_is_identity() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        board.add(&repo, text("flip"));
        let id = board.tasks()[0].id;

        board.toggle(&repo, id);
        assert!(board.tasks()[0].done);
        board.toggle(&repo, id);
        assert!(!board.tasks()[0].done);
    }

    #[test]
    fn failed_toggle_flips_locally() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        board.add(&repo, text("flip"));
        let id = board.tasks()[0].id;
        repo.fail_writes.set(true);

        board.toggle(&repo, id);

        assert!(board.tasks()[0].done);
        assert!(!repo.tasks.borrow()[0].done);
        assert_eq!(board.last_error(), Some(BoardError::ToggleFailed));
    }

    #[test]
    fn toggle_unknown_id_changes_nothing() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        board.add(&repo, text("only"));
        board.toggle(&repo, TaskId(42));
        assert!(!board.tasks()[0].done);
        assert_eq!(board.last_error(), None);
    }

    #[test]
    fn failed_initial_load_shows_placeholders() {
        let repo = FakeRepo::default();
        repo.fail_reads.set(true);
        let mut board = TaskBoard::new();

        board.load(&repo);

        assert_eq!(board.tasks(), placeholder_tasks().as_slice());
        assert_eq!(board.last_error(), Some(BoardError::LoadFailed));
    }

    #[test]
    fn failed_reload_keeps_current_tasks() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        board.add(&repo, text("kept"));
        repo.fail_reads.set(true);

        board.load(&repo);

        assert_eq!(board.tasks().len(), 1);
        assert_eq!(board.tasks()[0].text, "kept");
    }

    #[test]
    fn failed_refresh_after_write_still_shows_change() {
        let repo = FakeRepo::default();
        let mut board = TaskBoard::new();
        repo.fail_reads.set(true);

        board.add(&repo, text("written"));

        assert_eq!(board.tasks().len(), 1);
        assert_eq!(repo.tasks.borrow().len(), 1);
        assert_eq!(board.last_error(), Some(BoardError::LoadFailed));
    }

    #[test]
    fn local_ids_stay_unique() {
        let repo = FakeRepo::default();
        repo.fail_reads.set(true);
        repo.fail_writes.set(true);
        let mut board = TaskBoard::new();
        board.load(&repo);
        board.add(&repo, text("one"));
        board.add(&repo, text("two"));

        let mut ids: Vec<_> = board.tasks().iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), board.tasks().len());
    }
}
