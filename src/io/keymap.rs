//! Keyboard bindings for the operator dashboard
//!
//! - `1` NORMAL, `2` WEAR, `3` JAM
//! - `q` / `Esc` quit

use crate::domain::types::{Command, Regime};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Map a key press to an operator command
pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }
    match key.code {
        KeyCode::Char('1') => Some(Command::SetRegime(Regime::Normal)),
        KeyCode::Char('2') => Some(Command::SetRegime(Regime::Wear)),
        KeyCode::Char('3') => Some(Command::SetRegime(Regime::Jam)),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// Help line shown in the dashboard footer
pub const HELP: &str = "1: normal  2: bearing wear  3: jam  q/Esc: quit";
