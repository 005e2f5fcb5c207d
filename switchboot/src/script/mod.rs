//! Command scripts.
//!
//! A [`CommandScript`] is the ordered, immutable list of commands pushed to
//! one device. [`build`] selects a template purely from the device's family
//! and role and renders it; it never touches a session.
//!
//! Each [`CommandStep`] carries the [`ExecutionMode`] the interaction driver
//! uses to read its response, optional step-local [`Reaction`]s for dialogs
//! the command is known to open, and a redacted display form when the
//! command text embeds a secret.

mod cisco;
mod juniper;

use std::fmt;
use std::net::Ipv4Addr;

use secrecy::{ExposeSecret, SecretString};

use crate::credentials::Credentials;
use crate::device::{DeviceDescriptor, DeviceFamily};
use crate::error::{PlatformError, Result, ValidationError};

/// Placeholder shown in place of secrets.
pub const REDACTED: &str = "********";

/// How the driver waits for a step's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ExecutionMode {
    /// Wait for the standard prompt.
    Immediate,

    /// Collect output for a settle delay; the device may not show a clean prompt.
    TimingSensitive,

    /// Reboot: confirm, wait out the recovery window, then probe.
    InteractiveReload,
}

/// What to send back when a reaction fires.
#[derive(Clone)]
pub enum Reply {
    /// Literal text.
    Text(String),

    /// A secret, never displayed.
    Secret(SecretString),

    /// A bare line ending.
    Enter,
}

impl Reply {
    /// Text to send.
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) => text,
            Reply::Secret(secret) => secret.expose_secret(),
            Reply::Enter => "",
        }
    }

    /// Form safe for logs and transcripts.
    pub fn display(&self) -> &str {
        match self {
            Reply::Text(text) => text,
            Reply::Secret(_) => REDACTED,
            Reply::Enter => "<enter>",
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// A `(substring, reply)` rule for interactive dialogs.
#[derive(Debug, Clone)]
pub struct Reaction {
    trigger: String,
    reply: Reply,
}

impl Reaction {
    /// Create a reaction; the trigger matches case-insensitively.
    pub fn new(trigger: impl Into<String>, reply: Reply) -> Self {
        Self {
            trigger: trigger.into().to_lowercase(),
            reply,
        }
    }

    /// Trigger substring (lowercase).
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Reply to send.
    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Whether device output contains the trigger.
    pub fn matches(&self, output: &str) -> bool {
        output.to_lowercase().contains(&self.trigger)
    }
}

/// One command to send.
#[derive(Clone)]
pub struct CommandStep {
    text: String,
    mode: ExecutionMode,
    redacted: Option<String>,
    secrets: Vec<SecretString>,
    reactions: Vec<Reaction>,
}

impl CommandStep {
    /// Command waiting for the standard prompt.
    pub fn immediate(text: impl Into<String>) -> Self {
        Self::new(text, ExecutionMode::Immediate)
    }

    /// Command read with a settle delay.
    pub fn timed(text: impl Into<String>) -> Self {
        Self::new(text, ExecutionMode::TimingSensitive)
    }

    /// Device reboot.
    pub fn reload(text: impl Into<String>) -> Self {
        Self::new(text, ExecutionMode::InteractiveReload)
    }

    fn new(text: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            text: text.into(),
            mode,
            redacted: None,
            secrets: Vec::new(),
            reactions: Vec::new(),
        }
    }

    /// Mark `secret` as embedded in the text; it is masked wherever the
    /// step is displayed.
    pub fn conceal(mut self, secret: &SecretString) -> Self {
        let exposed = secret.expose_secret();
        if !exposed.is_empty() {
            let display = self.redacted.as_deref().unwrap_or(&self.text);
            self.redacted = Some(display.replace(exposed, REDACTED));
            self.secrets.push(secret.clone());
        }
        self
    }

    /// Add a step-local reaction.
    pub fn on(mut self, trigger: impl Into<String>, reply: Reply) -> Self {
        self.reactions.push(Reaction::new(trigger, reply));
        self
    }

    /// Text to send.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Form safe for logs and transcripts.
    pub fn display(&self) -> &str {
        self.redacted.as_deref().unwrap_or(&self.text)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_redacted(&self) -> bool {
        self.redacted.is_some()
    }

    /// Step-local reactions, checked before the driver's table.
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Every secret this step may send, embedded or as a reply.
    pub fn secrets(&self) -> impl Iterator<Item = &SecretString> {
        let replies = self.reactions.iter().filter_map(|reaction| match reaction.reply() {
            Reply::Secret(secret) => Some(secret),
            _ => None,
        });
        self.secrets.iter().chain(replies)
    }
}

impl fmt::Debug for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStep")
            .field("text", &self.display())
            .field("mode", &self.mode)
            .field("reactions", &self.reactions)
            .finish()
    }
}

/// Ordered command sequence for one device.
#[derive(Debug, Clone)]
pub struct CommandScript {
    body: Vec<CommandStep>,
    commit: Option<CommandStep>,
}

impl CommandScript {
    pub(crate) fn new(body: Vec<CommandStep>, commit: Option<CommandStep>) -> Self {
        Self { body, commit }
    }

    /// Steps run in the executing phase.
    pub fn body(&self) -> &[CommandStep] {
        &self.body
    }

    /// Final commit step, if the template has one.
    pub fn commit(&self) -> Option<&CommandStep> {
        self.commit.as_ref()
    }

    /// All steps in order, commit last.
    pub fn steps(&self) -> impl Iterator<Item = &CommandStep> {
        self.body.iter().chain(self.commit.iter())
    }

    /// Display forms of all steps, in order.
    pub fn commands(&self) -> Vec<&str> {
        self.steps().map(CommandStep::display).collect()
    }

    pub fn len(&self) -> usize {
        self.body.len() + usize::from(self.commit.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every secret any step may send.
    pub fn secrets(&self) -> impl Iterator<Item = &SecretString> {
        self.steps().flat_map(CommandStep::secrets)
    }
}

/// VLAN ids `start..=end` by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanRange {
    start: u16,
    end: u16,
    step: u16,
}

impl VlanRange {
    pub fn new(start: u16, end: u16, step: u16) -> std::result::Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidField {
            field: "vlans",
            reason,
        };
        if !(1..=4094).contains(&start) || !(1..=4094).contains(&end) {
            return Err(invalid(format!("{start}..={end} is outside 1..=4094")));
        }
        if start > end {
            return Err(invalid(format!("start {start} is after end {end}")));
        }
        if step == 0 {
            return Err(invalid("step must be positive".to_string()));
        }
        Ok(Self { start, end, step })
    }

    /// VLAN ids in the range.
    pub fn ids(&self) -> impl Iterator<Item = u16> {
        (self.start..=self.end).step_by(usize::from(self.step))
    }
}

impl Default for VlanRange {
    fn default() -> Self {
        Self {
            start: 10,
            end: 50,
            step: 10,
        }
    }
}

/// Maintenance job: create VLANs, save, and back up the startup config.
#[derive(Debug, Clone)]
pub struct VlanBackup {
    pub vlans: VlanRange,
    pub tftp_server: Ipv4Addr,
    /// Suffix of the backup file name (usually a timestamp).
    pub backup_label: String,
}

/// What a script accomplishes.
#[derive(Debug, Clone, Default)]
pub enum Task {
    /// Initial bring-up: identity, management address, SSH.
    #[default]
    EnableSsh,

    /// VLAN creation and TFTP backup.
    VlanBackup(VlanBackup),
}

/// Batch-wide inputs to [`build`].
#[derive(Debug, Clone, Default)]
pub struct ScriptParams {
    pub task: Task,

    /// Domain applied to every device; descriptors' own domains otherwise.
    pub domain: Option<String>,

    /// Management network gateway.
    pub mgt_gateway: Option<Ipv4Addr>,

    /// Erase and reload Cisco devices before configuring them.
    pub factory_reset: bool,
}

/// Render the command script for one device.
///
/// Fails with `UnsupportedRole` when no template exists for the device's
/// family and role, and with a validation error naming the first input the
/// template needs but does not have.
pub fn build(
    device: &DeviceDescriptor,
    credentials: &Credentials,
    params: &ScriptParams,
) -> Result<CommandScript> {
    match (device.family, &params.task) {
        (DeviceFamily::CiscoIos, Task::EnableSsh) => cisco::bring_up(device, credentials, params),
        (DeviceFamily::CiscoIos, Task::VlanBackup(job)) => {
            cisco::vlan_backup(device, credentials, job)
        }
        (DeviceFamily::JuniperJunos, Task::EnableSsh) => {
            juniper::bring_up(device, credentials, params)
        }
        (DeviceFamily::JuniperJunos | DeviceFamily::CumulusLinux, _) => Err(unsupported(device)),
    }
}

pub(crate) fn unsupported(device: &DeviceDescriptor) -> crate::error::Error {
    PlatformError::UnsupportedRole {
        family: device.family.to_string(),
        role: device.role.to_string(),
    }
    .into()
}

/// Resolve a field the template cannot do without.
pub(crate) fn need<T>(value: Option<T>, field: &'static str) -> std::result::Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField { field })
}
