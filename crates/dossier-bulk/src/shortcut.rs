//! Undo keyboard shortcut.
//!
//! Users write shortcuts as `"mod+z"` or `"ctrl-shift-z"`. `mod` is the
//! platform primary modifier: cmd on macOS, ctrl elsewhere. Either one
//! satisfies it, so the same config works on every platform.

use dossier_core::ConfigError;

// =============================================================================
// Keystroke
// =============================================================================

/// A concrete key event as delivered by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keystroke {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub cmd: bool,
    /// Lowercased key name, e.g. `"z"` or `"escape"`.
    pub key: String,
}

impl Keystroke {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into().to_lowercase(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn cmd(mut self) -> Self {
        self.cmd = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

// =============================================================================
// Shortcut
// =============================================================================

/// A parsed shortcut pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    ctrl: bool,
    alt: bool,
    shift: bool,
    cmd: bool,
    /// Set by `mod`.
    platform: bool,
    key: String,
}

impl Shortcut {
    /// Parse `"mod+z"`, `"cmd-shift-z"`, etc. Accepts `+` and `-` separators.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidShortcut(s.to_string());

        let normalized = s.trim().to_lowercase().replace('+', "-");
        let parts: Vec<&str> = normalized.split('-').collect();
        let (key, modifiers) = parts.split_last().ok_or_else(invalid)?;
        if key.is_empty() {
            return Err(invalid());
        }

        let mut shortcut = Shortcut {
            ctrl: false,
            alt: false,
            shift: false,
            cmd: false,
            platform: false,
            key: key.to_string(),
        };
        for modifier in modifiers {
            match *modifier {
                "mod" => shortcut.platform = true,
                "ctrl" | "control" => shortcut.ctrl = true,
                "cmd" | "super" | "meta" => shortcut.cmd = true,
                "alt" | "option" => shortcut.alt = true,
                "shift" => shortcut.shift = true,
                _ => return Err(invalid()),
            }
        }
        Ok(shortcut)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a key event fires this shortcut.
    pub fn matches(&self, keystroke: &Keystroke) -> bool {
        if keystroke.key != self.key
            || keystroke.shift != self.shift
            || keystroke.alt != self.alt
        {
            return false;
        }
        if self.platform {
            let extra_ctrl = keystroke.ctrl && !self.ctrl;
            let extra_cmd = keystroke.cmd && !self.cmd;
            // Exactly one of ctrl/cmd stands in for `mod`
            return (extra_ctrl ^ extra_cmd)
                && (keystroke.ctrl || !self.ctrl)
                && (keystroke.cmd || !self.cmd);
        }
        keystroke.ctrl == self.ctrl && keystroke.cmd == self.cmd
    }
}

// =============================================================================
// Latch
// =============================================================================

/// Fires a shortcut once per physical press.
///
/// Auto-repeat events and presses while the latch is held are swallowed until
/// the key is released.
#[derive(Debug, Clone)]
pub struct ShortcutLatch {
    shortcut: Shortcut,
    down: bool,
}

impl ShortcutLatch {
    pub fn new(shortcut: Shortcut) -> Self {
        Self {
            shortcut,
            down: false,
        }
    }

    pub fn shortcut(&self) -> &Shortcut {
        &self.shortcut
    }

    /// Returns `true` if this press should fire.
    pub fn press(&mut self, keystroke: &Keystroke, repeat: bool) -> bool {
        if !self.shortcut.matches(keystroke) {
            return false;
        }
        if repeat || self.down {
            return false;
        }
        self.down = true;
        true
    }

    /// Release on the shortcut's key, whatever modifiers remain held.
    pub fn release(&mut self, keystroke: &Keystroke) {
        if keystroke.key == self.shortcut.key {
            self.down = false;
        }
    }

    pub fn is_down(&self) -> bool {
        self.down
    }
}
