//! Filtering and ordering of the task list for display.

use crate::task::{Filter, Task};
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub all: usize,
    pub pending: usize,
    pub done: usize,
}

impl Counts {
    pub fn get(&self, filter: Filter) -> usize {
        match filter {
            Filter::All => self.all,
            Filter::Pending => self.pending,
            Filter::Done => self.done,
        }
    }
}

/// Tasks matching `filter`, newest first. Equal timestamps fall back to the
/// higher id first, so the order depends only on the task values.
pub fn visible(tasks: &[Task], filter: Filter) -> Vec<&Task> {
    let mut shown: Vec<&Task> = tasks.iter().filter(|t| filter.matches(t)).collect();
    shown.sort_by_key(|t| (Reverse(t.created_at), Reverse(t.id)));
    shown
}

pub fn counts(tasks: &[Task]) -> Counts {
    let done = tasks.iter().filter(|t| t.done).count();
    Counts {
        all: tasks.len(),
        pending: tasks.len() - done,
        done,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;
    use chrono::{TimeZone, Utc};

    fn task(id: i64, secs: i64, done: bool) -> Task {
        Task {
            id: TaskId(id),
            text: format!("task {id}"),
            done,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task(1, 100, false),
            task(2, 300, true),
            task(3, 200, false),
            task(4, 300, false),
            task(5, 50, true),
        ]
    }

    fn ids(tasks: &[&Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn all_is_whole_set_newest_first() {
        let tasks = sample();
        assert_eq!(ids(&visible(&tasks, Filter::All)), vec![4, 2, 3, 1, 5]);
    }

    #[test]
    fn subsets_respect_predicate() {
        let tasks = sample();
        let pending = visible(&tasks, Filter::Pending);
        assert!(pending.iter().all(|t| !t.done));
        assert_eq!(ids(&pending), vec![4, 3, 1]);

        let done = visible(&tasks, Filter::Done);
        assert!(done.iter().all(|t| t.done));
        assert_eq!(ids(&done), vec![2, 5]);
    }

    #[test]
    fn order_ignores_input_order() {
        let tasks = sample();
        let mut reversed = tasks.clone();
        reversed.reverse();
        for filter in Filter::ALL {
            assert_eq!(ids(&visible(&tasks, filter)), ids(&visible(&reversed, filter)));
            assert_eq!(visible(&tasks, filter), visible(&tasks, filter));
        }
    }

    #[test]
    fn empty_input() {
        assert!(visible(&[], Filter::All).is_empty());
        assert_eq!(counts(&[]), Counts::default());
    }

    #[test]
    fn counts_split_by_status() {
        let c = counts(&sample());
        assert_eq!(c, Counts { all: 5, pending: 3, done: 2 });
        assert_eq!(c.get(Filter::Done), 2);
    }
}
