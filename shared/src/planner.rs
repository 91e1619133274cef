//! Planner - drives the calendar state from a task store.
//!
//! Every successful write is followed by a full re-fetch; nothing is patched
//! into local state optimistically. Failures are kept on the state as a
//! display string and handed back to the caller.

use tracing::{info, warn};

use crate::calendar::{Action, CalendarState};
use crate::client::TaskStore;
use crate::models::{NewTask, Status, Task, TaskUpdate, YearMonth};
use crate::{Error, Result};

pub struct Planner<S> {
    store: S,
    state: CalendarState,
}

impl<S: TaskStore> Planner<S> {
    pub fn new(store: S, page: YearMonth) -> Self {
        Self {
            store,
            state: CalendarState::new(page),
        }
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply a pure view transition.
    pub fn dispatch(&mut self, action: Action) {
        self.state.reduce(action);
    }

    /// Fetch the whole collection again.
    pub async fn refresh(&mut self) -> Result<()> {
        self.state.reduce(Action::Loading);
        match self.store.select_all().await {
            Ok(tasks) => {
                info!(count = tasks.len(), "Loaded tasks");
                self.state.reduce(Action::Loaded(tasks));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn create(&mut self, task: NewTask) -> Result<Task> {
        let created = match self.store.insert(&task).await {
            Ok(created) => created,
            Err(e) => return Err(self.fail(e)),
        };
        info!(id = created.id, title = %created.title, "Created task");
        self.refresh().await?;
        Ok(created)
    }

    pub async fn update(&mut self, id: i64, task: TaskUpdate) -> Result<Task> {
        let updated = match self.store.update(id, &task).await {
            Ok(updated) => updated,
            Err(e) => return Err(self.fail(e)),
        };
        info!(id, "Updated task");
        self.refresh().await?;
        Ok(updated)
    }

    /// Handle a drop onto a status column.
    ///
    /// Returns `Ok(false)` without touching the store when the task already
    /// has that status.
    pub async fn move_task(&mut self, id: i64, status: Status) -> Result<bool> {
        let current = match self.state.task(id) {
            Some(task) => task.status,
            None => return Err(self.fail(Error::NotFound(format!("task {}", id)))),
        };
        if current == status {
            return Ok(false);
        }

        if let Err(e) = self.store.update_status(id, status).await {
            return Err(self.fail(e));
        }
        info!(id, from = %current, to = %status, "Moved task");
        self.refresh().await?;
        Ok(true)
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        if let Err(e) = self.store.delete(id).await {
            return Err(self.fail(e));
        }
        info!(id, "Deleted task");
        self.refresh().await
    }

    fn fail(&mut self, error: Error) -> Error {
        warn!(error = %error, "Planner operation failed");
        self.state.reduce(Action::LoadFailed(error.to_string()));
        error
    }
}
