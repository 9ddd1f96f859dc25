use anyhow::{anyhow, Result};
use codehelper_core::Mode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::warn;
use crate::app::{App, InputMode, Status};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::StateChanged(state) => app.apply_state(state),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
        InputMode::AttachPath => handle_attach_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => {
            if app.is_loading() {
                app.status = Some(Status::info("Waiting for the reply (Esc to cancel)"));
            } else {
                app.input_mode = InputMode::Editing;
                app.input_cursor = app.input.chars().count();
            }
        }
        KeyCode::Esc => app.cancel_request(),

        // Modes
        KeyCode::Char('1') => app.switch_mode(Mode::FreeChat),
        KeyCode::Char('2') => app.switch_mode(Mode::BugFix),
        KeyCode::Tab => app.toggle_mode(),
        KeyCode::Char('a') => app.begin_attach(),

        // Code blocks
        KeyCode::Char('n') => app.select_next_block(),
        KeyCode::Char('N') => app.select_prev_block(),
        KeyCode::Char('y') | KeyCode::Char('c') => copy_selected_block(app),

        // Scrolling
        KeyCode::Char('d') if ctrl => app.scroll_half_page_down(),
        KeyCode::Char('u') if ctrl => app.scroll_half_page_up(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_up(u16::MAX),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_input(),
        _ => edit_line(&mut app.input, &mut app.input_cursor, key),
    }
}

fn handle_attach_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_attach(),
        KeyCode::Enter => app.confirm_attach(),
        _ => edit_line(&mut app.path_input, &mut app.path_cursor, key),
    }
}

/// Single-line editing shared by the message box and the path prompt
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = text.chars().count();
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = text.chars().count();
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = text.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn copy_selected_block(app: &mut App) {
    let Some(text) = app.selected_block_text() else {
        app.status = Some(Status::info("No code block selected"));
        return;
    };

    app.status = Some(match copy_to_clipboard(&text) {
        Ok(tool) => Status::info(format!("Copied code block ({} chars) via {}", text.chars().count(), tool)),
        Err(e) => {
            warn!(error = %e, "clipboard copy failed");
            Status::error(e.to_string())
        }
    });
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

/// Pipe `text` into the first clipboard tool that is installed.
///
/// Returns the name of the tool used.
fn copy_to_clipboard(text: &str) -> Result<&'static str> {
    const TOOLS: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ];

    for (tool, args) in TOOLS {
        if pipe_to(tool, args, text)? == Some(true) {
            return Ok(*tool);
        }
    }

    Err(anyhow!("No clipboard tool found (install wl-copy, xclip or xsel)"))
}

/// Run `program` with `text` on stdin and wait for it.
///
/// `None` if the program could not be started, otherwise whether it exited
/// successfully. The child is always reaped, even when writing fails.
fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<Option<bool>> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let Ok(mut child) = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    else {
        return Ok(None);
    };

    // Dropping stdin closes the pipe so the tool sees EOF
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };
    if let Err(e) = written {
        let _ = child.kill();
        let _ = child.wait();
        return Err(anyhow!("Writing to {} failed: {}", program, e));
    }

    Ok(Some(child.wait()?.success()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        let s = "привет";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 4);
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }

    #[test]
    fn test_edit_line_inserts_and_deletes_at_cursor() {
        let mut text = String::new();
        let mut cursor = 0;
        for c in "héllo".chars() {
            edit_line(&mut text, &mut cursor, key(KeyCode::Char(c)));
        }
        assert_eq!(text, "héllo");

        edit_line(&mut text, &mut cursor, key(KeyCode::Home));
        edit_line(&mut text, &mut cursor, key(KeyCode::Right));
        edit_line(&mut text, &mut cursor, key(KeyCode::Delete));
        assert_eq!(text, "hllo");

        edit_line(&mut text, &mut cursor, key(KeyCode::End));
        edit_line(&mut text, &mut cursor, key(KeyCode::Backspace));
        assert_eq!(text, "hll");
        assert_eq!(cursor, 3);

        // Backspace at the start is a no-op
        edit_line(&mut text, &mut cursor, key(KeyCode::Home));
        edit_line(&mut text, &mut cursor, key(KeyCode::Backspace));
        assert_eq!(text, "hll");
        assert_eq!(cursor, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_to_reports_exit_status() {
        assert_eq!(pipe_to("cat", &[], "hello").unwrap(), Some(true));
        assert_eq!(pipe_to("false", &[], "").unwrap(), Some(false));
        assert_eq!(pipe_to("codehelper-no-such-tool", &[], "x").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_to_fails_when_reader_exits_early() {
        // `true` never reads, so a payload larger than the pipe buffer hits a broken pipe
        let text = "x".repeat(4 * 1024 * 1024);
        let err = pipe_to("true", &[], &text).unwrap_err();
        assert!(err.to_string().starts_with("Writing to true failed"), "{}", err);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 4, rect));
        assert!(!point_in_rect(6, 4, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
