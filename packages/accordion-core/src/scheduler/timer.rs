//! Cancelable deferred actions keyed to audio time

/// Handle of one scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CancelToken(u64);

#[derive(Debug)]
struct Task<T> {
    at: f64,
    token: CancelToken,
    action: T,
}

/// Actions ordered by due time, then by insertion.
///
/// Nothing runs on its own: the owner pops due actions with
/// [`TaskQueue::pop_due`] from its event loop turn.
#[derive(Debug)]
pub struct TaskQueue<T> {
    tasks: Vec<Task<T>>,
    next_token: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_token: 0,
        }
    }

    /// Schedule `action` at audio time `at`.
    pub fn schedule(&mut self, at: f64, action: T) -> CancelToken {
        let token = CancelToken(self.next_token);
        self.next_token += 1;

        // Later tokens go after every task due at the same time
        let index = self.tasks.partition_point(|task| task.at <= at);
        self.tasks.insert(index, Task { at, token, action });
        token
    }

    /// Drop a pending action. Returns false if it already ran or was canceled.
    pub fn cancel(&mut self, token: CancelToken) -> bool {
        match self.tasks.iter().position(|task| task.token == token) {
            Some(index) => {
                self.tasks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every listed action in one pass. Returns how many were pending.
    pub fn cancel_all<I: IntoIterator<Item = CancelToken>>(&mut self, tokens: I) -> usize {
        let tokens: std::collections::HashSet<CancelToken> = tokens.into_iter().collect();
        let before = self.tasks.len();
        self.tasks.retain(|task| !tokens.contains(&task.token));
        before - self.tasks.len()
    }

    /// Remove and return the earliest action due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(CancelToken, T)> {
        match self.tasks.first() {
            Some(task) if task.at <= now => {
                let task = self.tasks.remove(0);
                Some((task.token, task.action))
            }
            _ => None,
        }
    }

    /// Due time of the earliest pending action.
    pub fn next_due(&self) -> Option<f64> {
        self.tasks.first().map(|task| task.at)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
