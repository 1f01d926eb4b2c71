//! Key to action mapping of the terminal player.

use crate::models::settings::KeySettings;
use crate::system::bus::SessionCommand;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Lane(u8),
    Command(SessionCommand),
}

pub struct KeyMap {
    bindings: HashMap<char, KeyAction>,
}

impl KeyMap {
    pub fn new(keys: &KeySettings) -> Self {
        let mut bindings = HashMap::new();
        for (lane, key) in keys.lanes.iter().enumerate() {
            bindings.insert(key.to_ascii_lowercase(), KeyAction::Lane(lane as u8));
        }
        bindings.insert(keys.pause.to_ascii_lowercase(), KeyAction::Command(SessionCommand::Pause));
        bindings.insert(keys.resume.to_ascii_lowercase(), KeyAction::Command(SessionCommand::Resume));
        bindings.insert(keys.quit.to_ascii_lowercase(), KeyAction::Command(SessionCommand::Quit));
        log::debug!("INPUT: {} keys bound", bindings.len());
        Self { bindings }
    }

    pub fn action(&self, key: char) -> Option<KeyAction> {
        self.bindings.get(&key.to_ascii_lowercase()).copied()
    }

    /// Actions of a line of input, in order. Unbound characters are skipped.
    pub fn parse_line(&self, line: &str) -> Vec<KeyAction> {
        line.chars().filter_map(|c| self.action(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let map = KeyMap::new(&KeySettings::default());
        assert_eq!(map.action('d'), Some(KeyAction::Lane(0)));
        assert_eq!(map.action('K'), Some(KeyAction::Lane(4)));
        assert_eq!(map.action('p'), Some(KeyAction::Command(SessionCommand::Pause)));
        assert_eq!(map.action('z'), None);
    }

    #[test]
    fn test_line_keeps_order() {
        let map = KeyMap::new(&KeySettings::default());
        assert_eq!(
            map.parse_line("f x j q"),
            vec![
                KeyAction::Lane(1),
                KeyAction::Lane(3),
                KeyAction::Command(SessionCommand::Quit)
            ]
        );
    }
}
