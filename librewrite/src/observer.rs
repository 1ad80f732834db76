//! Session observers.
//!
//! Components that learn from what the user does (commit a candidate, wipe
//! their history, reload settings) register here once at startup. The
//! handler forwards every session command to each observer in registration
//! order.

use librewrite_core::{Candidate, CandidateAttributes, CharacterFormManager, Config};
use std::sync::Arc;

/// Session events observers react to.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// The user committed `candidate`
    Commit { candidate: Candidate },
    /// The user asked to forget learned history
    ClearUserHistory,
    /// Configuration changed
    ReloadConfig(Arc<Config>),
}

pub trait SessionObserver: Send + Sync {
    fn eval_command_handler(&self, command: &SessionCommand);
}

#[derive(Default)]
pub struct SessionObserverHandler {
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl SessionObserverHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn observers_size(&self) -> usize {
        self.observers.len()
    }
}

impl SessionObserver for SessionObserverHandler {
    fn eval_command_handler(&self, command: &SessionCommand) {
        for observer in &self.observers {
            observer.eval_command_handler(command);
        }
    }
}

/// Feeds commits into `CharacterFormManager` learning.
pub struct CharacterFormObserver {
    manager: Arc<CharacterFormManager>,
}

impl CharacterFormObserver {
    pub fn new(manager: Arc<CharacterFormManager>) -> Self {
        Self { manager }
    }
}

impl SessionObserver for CharacterFormObserver {
    fn eval_command_handler(&self, command: &SessionCommand) {
        let result = match command {
            SessionCommand::Commit { candidate } => {
                if candidate.has_attribute(CandidateAttributes::NO_LEARNING) {
                    return;
                }
                self.manager.guess_and_set_character_form(&candidate.value)
            }
            SessionCommand::ClearUserHistory => self.manager.clear_history(),
            SessionCommand::ReloadConfig(config) => self.manager.reload_config(config),
        };
        if let Err(e) = result {
            tracing::error!("character form observer failed on {:?}: {}", command, e);
        }
    }
}
