// Centralized keybinding definitions for netload
// The status bar hints and the key handler both read from this table

use crate::monitor::FrontendEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub key: &'static str,
    pub description: &'static str,
    pub action: FrontendEvent,
    codes: &'static [KeyCode],
}

/// Get all keybindings
pub fn get_all_keybindings() -> Vec<KeyBinding> {
    vec![
        KeyBinding {
            key: "n/Tab",
            description: "Next interface",
            action: FrontendEvent::NextInterface,
            codes: &[KeyCode::Char('n'), KeyCode::Tab],
        },
        KeyBinding {
            key: "r",
            description: "Redraw",
            action: FrontendEvent::Redraw,
            codes: &[KeyCode::Char('r')],
        },
        KeyBinding {
            key: "q/Esc/Ctrl+C",
            description: "Quit",
            action: FrontendEvent::Quit,
            codes: &[KeyCode::Char('q'), KeyCode::Esc],
        },
    ]
}

/// Map a key press to a monitor event
pub fn action_for(key: &KeyEvent) -> Option<FrontendEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(FrontendEvent::Quit);
    }

    get_all_keybindings()
        .into_iter()
        .find(|binding| binding.codes.contains(&key.code))
        .map(|binding| binding.action)
}

/// Get keybindings for the status bar
pub fn get_status_bar_keybindings() -> Vec<(&'static str, &'static str)> {
    get_all_keybindings()
        .into_iter()
        .map(|binding| (binding.key, binding.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_actions() {
        assert_eq!(
            action_for(&press(KeyCode::Char('n'))),
            Some(FrontendEvent::NextInterface)
        );
        assert_eq!(
            action_for(&press(KeyCode::Tab)),
            Some(FrontendEvent::NextInterface)
        );
        assert_eq!(
            action_for(&press(KeyCode::Char('r'))),
            Some(FrontendEvent::Redraw)
        );
        assert_eq!(action_for(&press(KeyCode::Esc)), Some(FrontendEvent::Quit));
        assert_eq!(action_for(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for(&key), Some(FrontendEvent::Quit));
        assert_eq!(action_for(&press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn test_status_bar_matches_bindings() {
        let hints = get_status_bar_keybindings();
        assert_eq!(hints.len(), get_all_keybindings().len());
        assert!(hints.contains(&("n/Tab", "Next interface")));
    }
}
