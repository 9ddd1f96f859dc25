use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use codehelper_core::{parse_segments, ContentSegment, Message, Mode, Role};
use crate::app::{App, InputMode};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::AttachPath {
        render_attach_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" CodeHelper ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(" "),
    ];

    // Radio-style mode selector
    for (i, mode) in Mode::all().into_iter().enumerate() {
        let active = mode == app.mode();
        let marker = if active { "(•)" } else { "( )" };
        let style = if active {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("{} {} ", marker, mode.as_str()), style));
        spans.push(Span::styled(format!("[{}] ", i + 1), Style::default().fg(Color::Gray)));
    }

    spans.push(Span::styled(
        format!(" {} ", app.model_uri),
        Style::default().fg(Color::Gray),
    ));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn role_line(label: &'static str, color: Color) -> Line<'static> {
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Append an assistant reply, rendering code blocks apart from prose.
///
/// `block_index` counts code blocks across the whole conversation so the
/// selection highlight lines up with `App::code_blocks`.
fn push_assistant_lines(
    lines: &mut Vec<Line<'static>>,
    message: &Message,
    block_index: &mut usize,
    selected: Option<usize>,
) {
    for segment in parse_segments(&message.text) {
        match segment {
            ContentSegment::Text(text) => {
                for line in text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ContentSegment::Code { language, body } => {
                let is_selected = selected == Some(*block_index);
                let header_style = if is_selected {
                    Style::default().bg(Color::Yellow).fg(Color::Black).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().bg(Color::DarkGray).fg(Color::White)
                };

                let mut header = vec![Span::styled(
                    format!(" {} ", language.as_deref().unwrap_or("Code")),
                    header_style,
                )];
                if is_selected {
                    header.push(Span::styled(" y copy ", Style::default().fg(Color::Yellow)));
                }
                lines.push(Line::from(header));

                let gutter = if is_selected { Color::Yellow } else { Color::DarkGray };
                for line in body.lines() {
                    lines.push(Line::from(vec![
                        Span::styled("│ ", Style::default().fg(gutter)),
                        Span::styled(line.to_string(), Style::default().fg(Color::Green)),
                    ]));
                }
                *block_index += 1;
            }
        }
    }
}

fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut block_index = 0;

    for msg in &app.state.messages {
        match msg.role {
            Role::User => {
                lines.push(role_line("You:", Color::Cyan));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Role::Assistant => {
                lines.push(role_line("AI:", Color::Yellow));
                push_assistant_lines(&mut lines, msg, &mut block_index, app.selected_block);
            }
            Role::System => {
                lines.push(Line::from(Span::styled(
                    msg.text.clone(),
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(role_line("AI:", Color::Yellow));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let title = format!(" {} ", app.mode().display_name());
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let chat_text = if app.state.messages.is_empty() && !app.is_loading() {
        Text::from(Span::styled(
            "Press i to ask a question, 2 to switch to bug-fix mode...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(chat_lines(app))
    };

    // Count rows with the same word wrapping the paragraph renders with
    let chat = Paragraph::new(chat_text).wrap(Wrap { trim: false });
    app.chat_total_lines = chat.line_count(app.chat_width).min(u16::MAX as usize) as u16;

    if app.follow_bottom {
        app.scroll_to_bottom();
    } else {
        app.chat_scroll = app.chat_scroll.min(app.chat_total_lines.saturating_sub(app.chat_height));
    }

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

/// Chars of `text` visible in a box `width` wide, scrolled to keep `cursor` in view
fn visible_slice(text: &str, cursor: usize, width: usize) -> (String, usize) {
    let scroll_offset = if width == 0 {
        0
    } else if cursor >= width {
        cursor - width + 1
    } else {
        0
    };
    let visible = text.chars().skip(scroll_offset).take(width).collect();
    (visible, scroll_offset)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.is_loading() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let mut title = vec![Span::raw(" Message ")];
    if let Some(file) = &app.state.attached_file {
        title.push(Span::styled(
            format!(" Attached file: {} ", file.name),
            Style::default().fg(Color::Green),
        ));
    } else if app.can_attach() {
        title.push(Span::styled(" a to attach a file ", Style::default().fg(Color::DarkGray)));
    }

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(title));

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;

    let input = if app.input.is_empty() && !editing {
        let placeholder = match app.mode() {
            Mode::FreeChat => "Type a message",
            Mode::BugFix => "Describe the bug",
        };
        Paragraph::new(placeholder).style(Style::default().fg(Color::DarkGray))
    } else {
        let (visible, _) = visible_slice(&app.input, app.input_cursor, inner_width);
        let style = if app.is_loading() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Paragraph::new(visible).style(style)
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if editing {
        let (_, offset) = visible_slice(&app.input, app.input_cursor, inner_width);
        let cursor_x = (app.input_cursor - offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing | InputMode::AttachPath => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
        InputMode::AttachPath => " ATTACH ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];

    // The last status message replaces the key hints until the next one
    if let Some(status) = &app.status {
        let style = if status.is_error {
            Style::default().bg(Color::Black).fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::Black).fg(Color::Green)
        };
        spans.push(Span::styled(format!(" {} ", status.text), style));
        spans.push(Span::styled(" ", label_style));
    }

    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Normal => {
            let mut hints = vec![("i", "edit"), ("1/2", "mode")];
            if app.can_attach() {
                hints.push(("a", "attach"));
            }
            if !app.code_blocks().is_empty() {
                hints.extend([("n/N", "block"), ("y", "copy")]);
            }
            hints.push(("j/k", "scroll"));
            if app.is_loading() {
                hints.push(("Esc", "cancel"));
            }
            hints.push(("q", "quit"));
            hints
        }
        InputMode::Editing => vec![("Enter", "send"), ("Esc", "stop typing")],
        InputMode::AttachPath => vec![("Enter", "attach"), ("Esc", "cancel")],
    };

    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Row `offset` of `inner`, if the popup is tall enough to have it
fn popup_row(inner: Rect, offset: u16) -> Option<Rect> {
    (offset < inner.height).then(|| Rect::new(inner.x, inner.y + offset, inner.width, 1))
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered), clamped to the terminal
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height.saturating_sub(4));
    if popup_width == 0 || popup_height == 0 {
        return;
    }

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach source file ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    if let Some(row) = popup_row(inner, 0) {
        let instructions = Paragraph::new("Path to the file with the bug. Enter to attach, Esc to cancel.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(instructions, row);
    }

    // Fall back to the first row when there is no room for the spacing
    if let Some(input_area) = popup_row(inner, 2).or_else(|| popup_row(inner, 0)) {
        let (visible, offset) = visible_slice(&app.path_input, app.path_cursor, input_area.width as usize);
        frame.render_widget(
            Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
            input_area,
        );

        let cursor_x = (app.path_cursor - offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
    }

    if let Some(row) = popup_row(inner, 4) {
        let limit = format!("Up to {} characters", app.attachment_policy.max_chars);
        frame.render_widget(
            Paragraph::new(limit).style(Style::default().fg(Color::DarkGray)),
            row,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    use crate::test_support::app_with;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_long_reply_tail_is_reachable() {
        let mut app = app_with(vec![]);
        app.state.messages = vec![Message::assistant(
            "aaaa bbbbbb cccc dddddd eeee ffffff gggg hhhhhh iiii jjjjjj kkkk FINALWORD",
        )];
        let mut terminal = Terminal::new(TestBackend::new(12, 11)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen_text(&terminal).contains("FINALWORD"));
        assert_eq!(app.chat_scroll, app.chat_total_lines - app.chat_height);

        // Scrolling up and back down lands on the same last page
        app.scroll_up(100);
        app.scroll_down(100);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen_text(&terminal).contains("FINALWORD"));
    }

    #[test]
    fn test_attach_prompt_on_short_terminals() {
        for (width, height) in [(80, 2), (80, 4), (80, 5), (80, 6), (80, 8), (3, 24)] {
            let mut app = app_with(vec![]);
            app.switch_mode(Mode::BugFix);
            app.begin_attach();
            app.path_input = "src/main.rs".to_string();
            app.path_cursor = 11;

            let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }
    }

    #[test]
    fn test_attach_prompt_shows_path() {
        let mut app = app_with(vec![]);
        app.switch_mode(Mode::BugFix);
        app.begin_attach();
        app.path_input = "src/main.rs".to_string();
        app.path_cursor = 11;

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Attach source file"));
        assert!(text.contains("src/main.rs"));
        assert!(text.contains("Up to 21000 characters"));
    }

    #[test]
    fn test_popup_row_stays_inside() {
        let inner = Rect::new(1, 1, 10, 3);
        assert_eq!(popup_row(inner, 2), Some(Rect::new(1, 3, 10, 1)));
        assert_eq!(popup_row(inner, 3), None);
        assert_eq!(popup_row(Rect::new(1, 1, 10, 0), 0), None);
    }

    #[test]
    fn test_visible_slice_follows_cursor() {
        assert_eq!(visible_slice("hello", 2, 10), ("hello".to_string(), 0));
        assert_eq!(visible_slice("hello world", 11, 5), ("orld".to_string(), 7));
        assert_eq!(visible_slice("привет", 6, 4), ("вет".to_string(), 3));
    }

    #[test]
    fn test_assistant_code_blocks_are_indexed_across_messages() {
        let mut lines = Vec::new();
        let mut index = 0;
        let first = Message::assistant("a\n```py\nprint(1)\n```");
        let second = Message::assistant("```\nx\n```\ndone");

        push_assistant_lines(&mut lines, &first, &mut index, Some(1));
        push_assistant_lines(&mut lines, &second, &mut index, Some(1));
        assert_eq!(index, 2);

        let rendered: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["a", " py ", "│ print(1)", " Code  y copy ", "│ x", "done"]
        );
    }
}
