//! Interaction driver settings.

use std::time::Duration;

use crate::script::{Reaction, Reply};

/// What to do when a device demands a password change mid-script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordRotationPolicy {
    /// Dismiss the prompt with two blank lines and record a warning.
    #[default]
    Skip,

    /// Abort the device with `PasswordRotationRequired`.
    Fail,
}

/// Reactions applied after every timing-sensitive step and reload.
pub fn default_reactions() -> Vec<Reaction> {
    vec![
        Reaction::new("Proceed with reload", Reply::Text("y".into())),
        Reaction::new("System configuration has been modified", Reply::Text("no".into())),
        Reaction::new("initial configuration dialog", Reply::Text("no".into())),
        Reaction::new("[confirm]", Reply::Enter),
    ]
}

/// Timing and policy knobs for [`InteractionDriver`](super::InteractionDriver).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use switchboot::driver::{DriverSettings, PasswordRotationPolicy};
///
/// let settings = DriverSettings::default()
///     .reload_window(Duration::from_secs(300))
///     .password_rotation(PasswordRotationPolicy::Fail)
///     .strict(true);
/// assert!(settings.strict);
/// ```
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub settle_delay: Duration,
    pub auth_settle: Duration,
    pub reload_window: Duration,
    pub strict: bool,
    pub password_rotation: PasswordRotationPolicy,
    pub reactions: Vec<Reaction>,
    pub max_reactions: usize,
    pub deadline: Option<Duration>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            auth_settle: Duration::from_secs(3),
            reload_window: Duration::from_secs(120),
            strict: false,
            password_rotation: PasswordRotationPolicy::default(),
            reactions: default_reactions(),
            max_reactions: 4,
            deadline: None,
        }
    }
}

impl DriverSettings {
    /// Quiet period that ends a timing-sensitive read (default: 2s).
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Pause after sending the Juniper root password (default: 3s).
    pub fn auth_settle(mut self, delay: Duration) -> Self {
        self.auth_settle = delay;
        self
    }

    /// Time a device is given to reboot after a reload (default: 120s).
    pub fn reload_window(mut self, window: Duration) -> Self {
        self.reload_window = window;
        self
    }

    /// Fail on unexpected prompts and failure patterns instead of proceeding.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn password_rotation(mut self, policy: PasswordRotationPolicy) -> Self {
        self.password_rotation = policy;
        self
    }

    /// Append a reaction to the table.
    pub fn reaction(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    /// Replace the reaction table.
    pub fn reactions(mut self, reactions: Vec<Reaction>) -> Self {
        self.reactions = reactions;
        self
    }

    /// How many chained reactions one step may trigger (default: 4).
    pub fn max_reactions(mut self, rounds: usize) -> Self {
        self.max_reactions = rounds;
        self
    }

    /// Per-device time limit, checked between steps.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DriverSettings::default();
        assert_eq!(settings.settle_delay, Duration::from_secs(2));
        assert_eq!(settings.auth_settle, Duration::from_secs(3));
        assert_eq!(settings.reload_window, Duration::from_secs(120));
        assert_eq!(settings.password_rotation, PasswordRotationPolicy::Skip);
        assert_eq!(settings.max_reactions, 4);
        assert!(!settings.strict);
        assert!(settings.deadline.is_none());
    }

    #[test]
    fn test_default_table_covers_reload_dialogs() {
        fn reply_for<'a>(table: &'a [Reaction], output: &str) -> Option<&'a str> {
            table
                .iter()
                .find(|r| r.matches(output))
                .map(|r| r.reply().display())
        }
        let table = default_reactions();
        let find = |output: &str| reply_for(&table, output);

        assert_eq!(find("Proceed with reload? [confirm]"), Some("y"));
        assert_eq!(find("System configuration has been modified. Save? [yes/no]:"), Some("no"));
        assert_eq!(
            find("Would you like to enter the initial configuration dialog? [yes/no]:"),
            Some("no")
        );
        assert_eq!(find("Continue? [confirm]"), Some("<enter>"));
        assert_eq!(find("Switch#"), None);
    }

    #[test]
    fn test_builder_appends_reaction() {
        let settings = DriverSettings::default()
            .reaction(Reaction::new("Press RETURN to get started", Reply::Enter))
            .max_reactions(2);
        assert_eq!(settings.reactions.len(), 5);
        assert_eq!(settings.max_reactions, 2);
    }
}
