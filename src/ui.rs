use bank_chat_core::{ChatMessage, ChatRole};
use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use crate::app::{App, SUGGESTIONS};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    // Headings and bullets keep their text, minus the markup
    let (text, base) = if let Some(heading) = text.trim_start().strip_prefix('#') {
        (
            heading.trim_start_matches('#').trim_start().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )
    } else if let Some(item) = text.trim_start().strip_prefix("- ").or_else(|| text.trim_start().strip_prefix("* ")) {
        (format!("  • {}", item), Style::default())
    } else {
        (text.to_string(), Style::default())
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), base));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, base.add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, base));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.conversation.is_empty() && !app.is_loading() {
        render_welcome(app, frame, chat_area);
    } else {
        render_chat(app, frame, chat_area);
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let session = match app.conversation.session_id() {
        Some(id) => format!(" session {} ", id),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" Bank Support AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(session, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let subtitle = Line::from(Span::styled(
        " Ask me anything about banking",
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(vec![title, subtitle]).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_welcome(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    app.total_chat_lines = 0;

    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "Welcome to Bank Support AI",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "I can help you with information about savings accounts, loans, credit cards, and more.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Press Tab to pick a question:",
            Style::default().fg(Color::DarkGray),
        )),
        Line::default(),
    ];

    for (idx, suggestion) in SUGGESTIONS.iter().enumerate() {
        let style = if app.suggestion_idx == Some(idx) {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(format!(" {} ", suggestion), style)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let welcome = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(welcome, area);
}

fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let time = msg.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string();
    let time_style = Style::default().fg(Color::DarkGray);

    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(vec![
                Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", time), time_style),
            ]));
            for line in msg.content.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan))));
            }
        }
        ChatRole::Assistant => {
            let label_color = if msg.error { Color::Red } else { Color::Yellow };
            lines.push(Line::from(vec![
                Span::styled("Assistant", Style::default().fg(label_color).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", time), time_style),
            ]));

            if msg.error {
                lines.push(Line::from(Span::styled(
                    msg.content.clone(),
                    Style::default().fg(Color::Red),
                )));
            } else {
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }

            if !msg.sources.is_empty() {
                lines.push(Line::from(Span::styled("Sources:", Style::default().fg(Color::Magenta))));
                for source in &msg.sources {
                    let mut spans = vec![Span::styled(
                        format!("  ↗ {}", source.label()),
                        Style::default().fg(Color::Magenta),
                    )];
                    if let Some(url) = &source.url {
                        spans.push(Span::styled(
                            format!("  {}", url),
                            Style::default().fg(Color::DarkGray).add_modifier(Modifier::UNDERLINED),
                        ));
                    }
                    lines.push(Line::from(spans));
                }
            }

            if let Some(method) = &msg.method {
                lines.push(Line::from(Span::styled(format!("Method: {}", method), time_style)));
            }

            if msg.escalate {
                lines.push(Line::from(Span::styled(
                    "Handed off to a human agent",
                    Style::default().fg(Color::LightRed).add_modifier(Modifier::ITALIC),
                )));
            }
        }
    }

    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let mut lines: Vec<Line> = app
        .conversation
        .messages()
        .iter()
        .flat_map(message_lines)
        .collect();

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Count rows with the same word wrapper that renders them
    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    app.total_chat_lines = u16::try_from(chat.line_count(app.chat_width)).unwrap_or(u16::MAX);

    if app.follow_tail {
        app.scroll = app.max_scroll();
    } else {
        app.scroll = app.scroll.min(app.max_scroll());
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Conversation ({}) ", app.conversation.messages().len()));

    let chat = chat.block(block).scroll((app.scroll, 0));

    frame.render_widget(chat, area);

    if app.max_scroll() > 0 {
        let mut scrollbar_state = ScrollbarState::new(app.max_scroll() as usize)
            .position(app.scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let loading = app.is_loading();
    let (title, border_color) = if loading {
        (" Waiting for a reply... ", Color::DarkGray)
    } else {
        (" Type your message ", Color::Yellow)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if loading {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let input = Paragraph::new(visible_text).style(text_style).block(input_block);
    frame.render_widget(input, area);

    if !loading {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mode = if app.is_loading() {
        Span::styled(" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        Span::styled(" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let mut hints = vec![
        mode,
        Span::styled(" ", label_style),
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", label_style),
    ];
    if app.conversation.is_empty() {
        hints.extend(vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" suggestion ", label_style),
        ]);
    } else {
        hints.extend(vec![
            Span::styled(" Ctrl+L ", key_style),
            Span::styled(" clear ", label_style),
        ]);
    }
    hints.extend(vec![
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_chat_core::{BackendClient, Source};
    use ratatui::{backend::TestBackend, Terminal};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_bold_markdown_is_styled() {
        let line = parse_markdown_line("Rate is **4.5% APY** today");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "4.5% APY");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(line_text(&line), "a **b");
    }

    #[test]
    fn test_bullets_and_headings() {
        assert_eq!(line_text(&parse_markdown_line("- Open online")), "  • Open online");
        let heading = parse_markdown_line("## Auto loans");
        assert_eq!(line_text(&heading), "Auto loans");
        assert!(heading.spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_assistant_lines_include_sources_and_method() {
        let msg = ChatMessage::assistant(
            2,
            "Call us.",
            vec![Source {
                url: Some("https://bank.example/cards".to_string()),
                source: Some("cards.md".to_string()),
                ..Default::default()
            }],
            Some("rag".to_string()),
            false,
        );
        let text: Vec<String> = message_lines(&msg).iter().map(line_text).collect();

        assert!(text.iter().any(|l| l.contains("cards.md") && l.contains("https://bank.example/cards")));
        assert!(text.iter().any(|l| l == "Method: rag"));
        assert!(!text.iter().any(|l| l.contains("human agent")));
    }

    #[test]
    fn test_error_message_is_plain() {
        let msg = ChatMessage::failure(3);
        let text: Vec<String> = message_lines(&msg).iter().map(line_text).collect();
        assert_eq!(text[1], bank_chat_core::ERROR_REPLY);
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_typing_indicator_visible_after_long_wrapped_message() {
        let client = BackendClient::new("http://127.0.0.1:1/api/v1").unwrap();
        let mut app = App::new(client);
        let mut terminal = Terminal::new(TestBackend::new(24, 20)).unwrap();

        app.send("abcdefghi abcdefghi ".repeat(30));
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let screen = screen_text(&terminal);
        assert!(screen.contains("Typing"), "typing indicator off-screen:\n{}", screen);
        assert_eq!(app.scroll, app.max_scroll());
    }

    #[tokio::test]
    async fn test_scroll_down_reaches_last_wrapped_row() {
        let client = BackendClient::new("http://127.0.0.1:1/api/v1").unwrap();
        let mut app = App::new(client);
        let mut terminal = Terminal::new(TestBackend::new(24, 20)).unwrap();

        app.send("savings checking mortgage ".repeat(20));
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        app.scroll_up(u16::MAX);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(!screen_text(&terminal).contains("Typing"));

        app.scroll_down(u16::MAX);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen_text(&terminal).contains("Typing"));
    }
}
