use crate::board::TaskBoard;
use crate::diagnostics::Diagnostics;
use crate::store::TaskRepository;
use crate::task::{Filter, Task, TaskId, TaskText};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

/// A swiped row stays shifted until the reset delay has elapsed.
#[derive(Debug, Clone, Copy)]
struct Swipe {
    id: TaskId,
    direction: SwipeDirection,
    started: Instant,
}

pub struct App<R: TaskRepository> {
    repo: R,
    pub board: TaskBoard,
    pub filter: Filter,
    pub input: String,
    pub mode: InputMode,
    pub list_state: ListState,
    pub diagnostics: Diagnostics,
    pub should_quit: bool,
    swipe: Option<Swipe>,
    swipe_reset: Duration,
}

impl<R: TaskRepository> App<R> {
    pub fn new(repo: R, filter: Filter, swipe_reset: Duration) -> Self {
        let mut board = TaskBoard::new();
        board.load(&repo);
        let diagnostics = Diagnostics::fetch(&repo);
        let mut app = Self {
            repo,
            board,
            filter,
            input: String::new(),
            mode: InputMode::Normal,
            list_state: ListState::default(),
            diagnostics,
            should_quit: false,
            swipe: None,
            swipe_reset,
        };
        app.clamp_selection();
        app
    }

    #[cfg(test)]
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn visible(&self) -> Vec<&Task> {
        self.board.visible(self.filter)
    }

    pub fn selected_task(&self) -> Option<TaskId> {
        let index = self.list_state.selected()?;
        self.visible().get(index).map(|t| t.id)
    }

    pub fn swipe_of(&self, id: TaskId) -> Option<SwipeDirection> {
        self.swipe.filter(|s| s.id == id).map(|s| s.direction)
    }

    pub fn swipe_active(&self) -> bool {
        self.swipe.is_some()
    }

    /// Clears an expired swipe offset.
    pub fn tick(&mut self, now: Instant) {
        if let Some(swipe) = self.swipe {
            if now.duration_since(swipe.started) >= self.swipe_reset {
                self.swipe = None;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key.code),
            InputMode::Editing => self.handle_editing_key(key.code),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('a') | KeyCode::Char('i') => self.mode = InputMode::Editing,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Left | KeyCode::Char('h') => self.swipe_toggle(SwipeDirection::Left),
            KeyCode::Right | KeyCode::Char('l') => self.swipe_toggle(SwipeDirection::Right),
            KeyCode::Tab => self.set_filter(self.filter.next()),
            KeyCode::BackTab => self.set_filter(self.filter.prev()),
            KeyCode::Char('1') => self.set_filter(Filter::All),
            KeyCode::Char('2') => self.set_filter(Filter::Pending),
            KeyCode::Char('3') => self.set_filter(Filter::Done),
            KeyCode::Char('r') => {
                self.board.load(&self.repo);
                self.clamp_selection();
            }
            _ => {}
        }
    }

    fn handle_editing_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.submit();
            }
            KeyCode::Esc => {
                self.input.clear();
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    /// Adds the typed task. Blank input is ignored and left in the field.
    pub fn submit(&mut self) -> bool {
        let Some(text) = TaskText::parse(&self.input) else {
            debug!("ignored blank task");
            return false;
        };
        self.board.add(&self.repo, text);
        self.input.clear();
        self.mode = InputMode::Normal;
        self.list_state.select(Some(0));
        self.clamp_selection();
        true
    }

    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_task() {
            self.board.toggle(&self.repo, id);
            self.clamp_selection();
        }
    }

    fn swipe_toggle(&mut self, direction: SwipeDirection) {
        if let Some(id) = self.selected_task() {
            self.swipe = Some(Swipe {
                id,
                direction,
                started: Instant::now(),
            });
            self.toggle_selected();
        }
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.list_state.select(Some(0));
        self.clamp_selection();
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.visible().len();
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.list_state.select(Some(next));
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        let selected = match (len, self.list_state.selected()) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(i)) => Some(i.min(len - 1)),
        };
        self.list_state.select(selected);
    }
}
