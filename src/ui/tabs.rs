use std::fmt::Display;

use tracing::debug;

use crate::error::SettingsError;

use super::settings_editor::{LeaveDecision, LeaveGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Chart,
    Settings,
}

impl Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tab::Home => write!(f, "home"),
            Tab::Chart => write!(f, "chart"),
            Tab::Settings => write!(f, "settings"),
        }
    }
}

/// Owns the active tab. Screens that need to change tabs get the controller (or the callback it
/// wraps) passed down to them.
pub struct TabController {
    active: Tab,
    on_change: Box<dyn FnMut(Tab) + Send>,
}

impl TabController {
    pub fn new(initial: Tab, on_change: Box<dyn FnMut(Tab) + Send>) -> Self {
        Self {
            active: initial,
            on_change,
        }
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    /// Switches to `tab`. Leaving the settings tab goes through `guard` first. Returns whether
    /// the switch happened; a failed save keeps the settings tab open and reports the error.
    pub async fn switch_to(
        &mut self,
        tab: Tab,
        guard: &mut dyn LeaveGuard,
    ) -> Result<bool, SettingsError> {
        if tab == self.active {
            return Ok(false);
        }
        if self.active == Tab::Settings {
            match guard.confirm_leave() {
                LeaveDecision::Cancel => {
                    debug!("Staying on settings");
                    return Ok(false);
                }
                LeaveDecision::SaveThenProceed => guard.save_before_leave().await?,
                LeaveDecision::Proceed => guard.discard(),
            }
        }
        self.active = tab;
        (self.on_change)(tab);
        Ok(true)
    }
}
