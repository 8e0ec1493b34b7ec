//! Command history ownership
//!
//! Each attached process owns at most one history, keyed by application
//! name. Released histories are kept so the next process of the same
//! application picks up where the last one left off.

use consrv_protocol::ProcessKey;
use consrv_utils::{ConsoleError, Result};

/// One command history slot
#[derive(Debug)]
pub struct CommandHistory {
    app_name: String,
    owner: Option<ProcessKey>,
    last_allocated: u64,
}

impl CommandHistory {
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn owner(&self) -> Option<ProcessKey> {
        self.owner
    }
}

/// The bounded set of command histories of one console
#[derive(Debug)]
pub struct CommandHistoryList {
    histories: Vec<CommandHistory>,
    limit: usize,
    clock: u64,
}

impl CommandHistoryList {
    pub fn new(limit: usize) -> Self {
        Self {
            histories: Vec::new(),
            limit,
            clock: 0,
        }
    }

    /// Give `owner` a history for `app_name`
    ///
    /// Prefers a released history of the same application, then a new slot
    /// while under the limit, then the least recently allocated released
    /// history of any application.
    pub fn allocate(&mut self, app_name: &str, owner: ProcessKey) -> Result<()> {
        self.clock += 1;
        let clock = self.clock;

        if let Some(history) = self
            .histories
            .iter_mut()
            .find(|h| h.owner.is_none() && h.app_name.eq_ignore_ascii_case(app_name))
        {
            history.owner = Some(owner);
            history.last_allocated = clock;
            return Ok(());
        }

        if self.histories.len() < self.limit {
            self.histories.push(CommandHistory {
                app_name: app_name.to_string(),
                owner: Some(owner),
                last_allocated: clock,
            });
            return Ok(());
        }

        match self
            .histories
            .iter_mut()
            .filter(|h| h.owner.is_none())
            .min_by_key(|h| h.last_allocated)
        {
            Some(history) => {
                history.app_name = app_name.to_string();
                history.owner = Some(owner);
                history.last_allocated = clock;
                Ok(())
            }
            None => Err(ConsoleError::resource_allocation(format!(
                "all {} command histories are in use",
                self.limit
            ))),
        }
    }

    /// Release the history held by `owner`; returns false if it held none
    pub fn free(&mut self, owner: ProcessKey) -> bool {
        match self.histories.iter_mut().find(|h| h.owner == Some(owner)) {
            Some(history) => {
                history.owner = None;
                true
            }
            None => false,
        }
    }

    pub fn find(&self, owner: ProcessKey) -> Option<&CommandHistory> {
        self.histories.iter().find(|h| h.owner == Some(owner))
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_find() {
        let mut list = CommandHistoryList::new(4);
        list.allocate("cmd.exe", ProcessKey(1)).unwrap();
        assert_eq!(list.find(ProcessKey(1)).unwrap().app_name(), "cmd.exe");
    }

    #[test]
    fn test_released_history_reused_by_same_app() {
        let mut list = CommandHistoryList::new(4);
        list.allocate("bash", ProcessKey(1)).unwrap();
        assert!(list.free(ProcessKey(1)));

        list.allocate("BASH", ProcessKey(2)).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.find(ProcessKey(2)).unwrap().app_name(), "bash");
    }

    #[test]
    fn test_free_is_idempotent() {
        let mut list = CommandHistoryList::new(4);
        list.allocate("bash", ProcessKey(1)).unwrap();
        assert!(list.free(ProcessKey(1)));
        assert!(!list.free(ProcessKey(1)));
        assert!(!list.free(ProcessKey(99)));
    }

    #[test]
    fn test_recycles_least_recent_when_full() {
        let mut list = CommandHistoryList::new(2);
        list.allocate("a", ProcessKey(1)).unwrap();
        list.allocate("b", ProcessKey(2)).unwrap();
        list.free(ProcessKey(1));
        list.free(ProcessKey(2));

        list.allocate("c", ProcessKey(3)).unwrap();
        assert_eq!(list.len(), 2);
        // "a" was allocated first so it is the one recycled
        assert_eq!(list.find(ProcessKey(3)).unwrap().app_name(), "c");
        assert!(list.histories.iter().any(|h| h.app_name() == "b"));
    }

    #[test]
    fn test_full_and_all_owned_fails() {
        let mut list = CommandHistoryList::new(1);
        list.allocate("a", ProcessKey(1)).unwrap();
        let err = list.allocate("b", ProcessKey(2)).unwrap_err();
        assert!(matches!(err, ConsoleError::ResourceAllocation(_)));
        assert!(list.find(ProcessKey(2)).is_none());
    }
}
