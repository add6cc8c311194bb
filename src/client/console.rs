//! Interactive console: type a line, press Enter, see the reply.
//!
//! Runs the terminal in raw mode so ESC can end the session. Each submitted
//! line is one send followed by one bounded receive on the same connection.

use crate::client::session::Session;
use crate::config::SessionSettings;
use crate::error::ClientError;
use crossterm::{
    cursor::MoveToColumn,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use futures::StreamExt;
use std::io::{self, Stdout, Write};
use tracing::{info, warn};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

const PROMPT: &str = "> ";

/// What a key press means to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Submit,
    Edit,
}

fn classify(key: &KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') | KeyCode::Char('d')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            KeyAction::Quit
        }
        KeyCode::Enter => KeyAction::Submit,
        _ => KeyAction::Edit,
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Interactive mode reads keys, so stdin must be a terminal.
pub fn ensure_terminal() -> Result<(), ClientError> {
    if atty::is(atty::Stream::Stdin) {
        Ok(())
    } else {
        Err(ClientError::Argument(
            "interactive mode needs a terminal on stdin".to_string(),
        ))
    }
}

/// Run the console until the user quits or the connection fails.
pub async fn run_console(
    session: &mut Session,
    settings: &SessionSettings,
) -> Result<(), ClientError> {
    info!(
        "Connected to {}. Press ESC or CTRL+C to quit",
        session.peer()
    );

    let _raw = RawModeGuard::enable().map_err(ClientError::Terminal)?;
    let mut stdout = io::stdout();
    let mut events = EventStream::new();
    let mut input = Input::default();

    draw_prompt(&mut stdout, &input)?;

    while let Some(event) = events.next().await {
        let event = event.map_err(ClientError::Terminal)?;
        let Event::Key(key) = event else {
            continue;
        };
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match classify(&key) {
            KeyAction::Quit => {
                write_raw(&mut stdout, "\n")?;
                info!("Disconnecting from {}...", session.peer());
                return Ok(());
            }
            KeyAction::Submit => {
                let line = input.value().to_string();
                input.reset();
                write_raw(&mut stdout, "\n")?;

                let payload = settings.encoding.encode(&line);
                match session
                    .send_receive(&payload, settings.timeout, settings.buffer_size)
                    .await
                {
                    Ok(reply) => {
                        let mut text = settings.encoding.decode(&reply);
                        if !text.ends_with('\n') {
                            text.push('\n');
                        }
                        write_raw(&mut stdout, &text)?;
                    }
                    // Unlike one-shot mode, a quiet server doesn't end the session.
                    Err(ClientError::ReceiveTimeout(timeout)) => {
                        warn!("No response within {:?}", timeout);
                    }
                    Err(e) => return Err(e),
                }
            }
            KeyAction::Edit => {
                input.handle_event(&Event::Key(key));
            }
        }

        draw_prompt(&mut stdout, &input)?;
    }

    Ok(())
}

/// Raw mode doesn't translate `\n`, so do it here.
fn to_raw_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

fn write_raw(stdout: &mut Stdout, text: &str) -> Result<(), ClientError> {
    queue!(stdout, Print(to_raw_newlines(text))).map_err(ClientError::Terminal)?;
    stdout.flush().map_err(ClientError::Terminal)
}

fn draw_prompt(stdout: &mut Stdout, input: &Input) -> Result<(), ClientError> {
    let cursor = (PROMPT.len() + input.visual_cursor()) as u16;
    queue!(
        stdout,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(PROMPT),
        Print(input.value()),
        MoveToColumn(cursor)
    )
    .map_err(ClientError::Terminal)?;
    stdout.flush().map_err(ClientError::Terminal)
}
