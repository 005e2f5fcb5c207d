//! Terminal secret prompt.

use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use secrecy::SecretString;
use switchboot::credentials::SecretPrompt;
use switchboot::error::CredentialError;
use tokio::sync::Mutex;

/// Environment variable holding a secret for unattended runs.
pub const SECRET_ENV: &str = "SWITCHBOOT_SECRET";

/// Reads secrets from the terminal without echo, or from [`SECRET_ENV`].
pub struct TerminalPrompt {
    preset: Option<SecretString>,
    terminal: Mutex<()>,
}

impl TerminalPrompt {
    pub fn from_env() -> Self {
        Self {
            preset: std::env::var(SECRET_ENV)
                .ok()
                .filter(|value| !value.is_empty())
                .map(SecretString::from),
            terminal: Mutex::new(()),
        }
    }
}

impl SecretPrompt for TerminalPrompt {
    async fn read_secret(&self, prompt: &str) -> Result<SecretString, CredentialError> {
        if let Some(secret) = &self.preset {
            return Ok(secret.clone());
        }

        let _terminal = self.terminal.lock().await;
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || read_hidden(&prompt))
            .await
            .map_err(|e| CredentialError::Prompt(e.to_string()))?
    }
}

fn read_hidden(prompt: &str) -> Result<SecretString, CredentialError> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}").and_then(|()| stderr.flush()).map_err(prompt_error)?;

    terminal::enable_raw_mode().map_err(prompt_error)?;
    let line = read_line();
    let restored = terminal::disable_raw_mode();
    let _ = writeln!(stderr);

    restored.map_err(prompt_error)?;
    line.map(SecretString::from)
}

fn read_line() -> Result<String, CredentialError> {
    let mut line = String::new();
    loop {
        let Event::Key(key) = event::read().map_err(prompt_error)? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match edit(&mut line, key) {
            Edit::Continue => {}
            Edit::Done => return Ok(line),
            Edit::Abort => return Err(CredentialError::Prompt("interrupted".to_string())),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Edit {
    Continue,
    Done,
    Abort,
}

/// Apply one key press to the line being typed.
fn edit(line: &mut String, key: KeyEvent) -> Edit {
    match key.code {
        KeyCode::Enter => Edit::Done,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => Edit::Abort,
        KeyCode::Esc => Edit::Abort,
        KeyCode::Backspace => {
            line.pop();
            Edit::Continue
        }
        KeyCode::Char(c) => {
            line.push(c);
            Edit::Continue
        }
        _ => Edit::Continue,
    }
}

fn prompt_error(err: io::Error) -> CredentialError {
    CredentialError::Prompt(err.to_string())
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_line_editing() {
        let mut line = String::new();
        for c in "s3cx".chars() {
            assert_eq!(edit(&mut line, key(KeyCode::Char(c))), Edit::Continue);
        }
        edit(&mut line, key(KeyCode::Backspace));
        edit(&mut line, key(KeyCode::Char('r')));
        assert_eq!(edit(&mut line, key(KeyCode::Enter)), Edit::Done);
        assert_eq!(line, "s3cr");
    }

    #[test]
    fn test_ctrl_c_aborts() {
        let mut line = String::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(edit(&mut line, ctrl_c), Edit::Abort);
        assert!(line.is_empty());
    }

    #[tokio::test]
    async fn test_preset_secret_answers_every_prompt() {
        let prompt = TerminalPrompt {
            preset: Some(SecretString::from("from-env".to_string())),
            terminal: Mutex::new(()),
        };
        let first = prompt.read_secret("Secret: ").await.unwrap();
        let again = prompt.read_secret("Confirm secret: ").await.unwrap();
        assert_eq!(first.expose_secret(), "from-env");
        assert_eq!(again.expose_secret(), first.expose_secret());
    }
}
