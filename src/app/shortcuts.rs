use super::controller::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Char(char),
}

/// The control holding keyboard focus when the key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    AnalyzeButton,
    CaptureButton,
    UploadArea,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
    pub focus: Focus,
}

impl KeyPress {
    pub fn new(key: Key, focus: Focus) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            focus,
        }
    }
}

/// Maps a key press onto a command given what is currently enabled.
pub fn resolve(press: KeyPress, capture_enabled: bool, camera_active: bool) -> Option<Command> {
    match (press.key, press.focus) {
        (Key::Enter, Focus::AnalyzeButton) => Some(Command::Analyze),
        (Key::Enter | Key::Space, Focus::UploadArea) => Some(Command::BrowseRequested),
        (Key::Space, Focus::CaptureButton) => Some(Command::Capture),
        (Key::Char('c'), _) if !press.ctrl && !press.meta && capture_enabled => {
            Some(Command::Capture)
        }
        (Key::Escape, _) if camera_active => Some(Command::StopCamera),
        _ => None,
    }
}
