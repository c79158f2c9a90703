// Scripted input source

use std::collections::VecDeque;

use crate::display::InputSource;

/// Replays one scripted key list per poll, then falls back to `idle`
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    polls: VecDeque<Vec<String>>,
    idle: Vec<String>,
    polls_made: usize,
}

impl ScriptedInput {
    pub fn new<I, P, K>(polls: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            polls: polls
                .into_iter()
                .map(|keys| keys.into_iter().map(Into::into).collect())
                .collect(),
            idle: Vec::new(),
            polls_made: 0,
        }
    }

    /// Keys returned by every poll once the script is exhausted
    pub fn with_idle<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.idle = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Queue another poll result at the end of the script
    pub fn push<K: Into<String>>(&mut self, keys: impl IntoIterator<Item = K>) {
        self.polls
            .push_back(keys.into_iter().map(Into::into).collect());
    }

    /// Scripted polls not consumed yet
    pub fn remaining(&self) -> usize {
        self.polls.len()
    }

    pub fn polls_made(&self) -> usize {
        self.polls_made
    }
}

impl InputSource for ScriptedInput {
    fn poll_pressed_keys(&mut self) -> Vec<String> {
        self.polls_made += 1;
        self.polls
            .pop_front()
            .unwrap_or_else(|| self.idle.clone())
    }

    /// Nothing is pending between scripted polls.
    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_script_then_idle() {
        let mut input = ScriptedInput::new(vec![vec!["a"], vec!["b", "c"]]).with_idle(["z"]);
        input.clear();
        assert_eq!(input.poll_pressed_keys(), vec!["a"]);
        assert_eq!(input.poll_pressed_keys(), vec!["b", "c"]);
        assert_eq!(input.remaining(), 0);
        assert_eq!(input.poll_pressed_keys(), vec!["z"]);
        assert_eq!(input.polls_made(), 3);
    }

    #[test]
    fn test_empty_script_polls_nothing() {
        let mut input = ScriptedInput::default();
        assert!(input.poll_pressed_keys().is_empty());
        input.push(["space"]);
        assert_eq!(input.poll_pressed_keys(), vec!["space"]);
    }
}
