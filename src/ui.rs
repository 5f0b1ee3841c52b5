use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, FocusPane, InputMode, GREETING};
use crate::conversation::Role;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    let [sidebar_area, main_area] =
        Layout::horizontal([Constraint::Length(30), Constraint::Min(0)]).areas(body_area);

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(main_area);

    // Store areas for mouse hit-testing
    app.sidebar_area = Some(sidebar_area);
    app.chat_area = Some(chat_area);

    render_sidebar(app, frame, sidebar_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_quiz {
        render_quiz_popup(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" GPTsim ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("simulated chat assistant", Style::default().fg(Color::Black)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_color = if app.focus == FocusPane::Sidebar {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Conversations ({}) ", app.store.len()));

    let active = app.store.active_index();
    let items: Vec<ListItem> = app
        .store
        .conversations()
        .iter()
        .enumerate()
        .map(|(index, conversation)| {
            // The active conversation carries a marker even when the
            // sidebar highlight sits elsewhere
            let marker = if Some(index) == active { "* " } else { "  " };
            let style = if Some(index) == active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}{}", marker, conversation.title())).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.sidebar_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let border_color = if app.focus == FocusPane::Chat {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = app
        .store
        .active()
        .map(|conversation| conversation.title())
        .unwrap_or_else(|| "Chat".to_string());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", title));

    // Store inner dimensions for scroll calculations
    let inner = block.inner(area);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    let visible = app
        .store
        .active()
        .map(|conversation| conversation.visible_messages())
        .unwrap_or(&[]);

    let mut lines: Vec<Line> = Vec::new();

    if visible.is_empty() && !app.reply_loading {
        lines.push(assistant_label());
        lines.push(Line::from(GREETING));
    }

    for message in visible {
        match message.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            Role::Assistant => lines.push(assistant_label()),
            // The system prompt is never displayed
            Role::System => continue,
        }
        for line in message.content.lines() {
            lines.push(Line::from(line));
        }
        lines.push(Line::default());
    }

    if app.reply_loading {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(assistant_label());
        lines.push(Line::from(Span::styled(
            format!("AI is typing{}", dots),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn assistant_label() -> Line<'static> {
    Line::from(Span::styled(
        "GPTsim:",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Input {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = if app.reply_loading {
        " Waiting for reply... "
    } else {
        " Message (Enter to send) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Scroll the text horizontally so the cursor stays visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.input_cursor >= inner_width {
        app.input_cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (app.input_cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " TYPING ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.show_quiz {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" option ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(
                if app.quiz.answered.is_some() {
                    " next "
                } else {
                    " answer "
                },
                label_style,
            ),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else if app.input_mode == InputMode::Editing {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
        ]
    } else {
        let mut hints = vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
        ];

        match app.focus {
            FocusPane::Sidebar => hints.extend(vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" open ", label_style),
                Span::styled(" d ", key_style),
                Span::styled(" delete ", label_style),
            ]),
            _ => hints.extend(vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
            ]),
        }

        hints.extend(vec![
            Span::styled(" n ", key_style),
            Span::styled(" new ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" clear ", label_style),
            Span::styled(" Q ", key_style),
            Span::styled(" quiz ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]);
        hints
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(hints);

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_quiz_popup(app: &mut App, frame: &mut Frame, area: Rect) {
    let option_count = app
        .quiz
        .question
        .as_ref()
        .map(|question| question.options.len())
        .unwrap_or(0) as u16;

    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = (option_count + 6).min(area.height.saturating_sub(4));
    let popup_x = area.width.saturating_sub(popup_width) / 2;
    let popup_y = area.height.saturating_sub(popup_height) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Psychology Quiz ");

    let Some(question) = app.quiz.question.clone() else {
        let placeholder = Paragraph::new("The knowledge base has no quiz questions.")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(placeholder, popup_area);
        return;
    };

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Question text at the top. The fixed-height rows are clipped to the
    // inner area, so a cramped popup truncates instead of drawing outside
    // the frame.
    let question_area = Rect::new(inner.x, inner.y, inner.width, 2).intersection(inner);
    let question_text = Paragraph::new(question.question.as_str())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true });
    frame.render_widget(question_text, question_area);

    // Options below; after answering, the correct option goes green and a
    // wrong pick red
    let list_height = inner.height.saturating_sub(4);
    let list_area =
        Rect::new(inner.x, inner.y + 2, inner.width, list_height).intersection(inner);

    let items: Vec<ListItem> = question
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let style = match app.quiz.answered {
                Some(_) if index == question.correct => Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
                Some(answered) if index == answered => Style::default().fg(Color::Red),
                _ => Style::default(),
            };
            ListItem::new(format!(" {} ", option)).style(style)
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.quiz.options_state);

    // Feedback line at the bottom
    let feedback_area = Rect::new(
        inner.x,
        inner.y + inner.height.saturating_sub(1),
        inner.width,
        1,
    )
    .intersection(inner);
    let feedback = match app.quiz.answered {
        Some(answered) if answered == question.correct => {
            Paragraph::new("Correct! Enter for another question.")
                .style(Style::default().fg(Color::Green).bold())
        }
        Some(_) => Paragraph::new(format!(
            "Incorrect. The answer is {}.",
            question
                .options
                .get(question.correct)
                .map(String::as_str)
                .unwrap_or("missing")
        ))
        .style(Style::default().fg(Color::Red)),
        None => Paragraph::new("Enter to answer, Esc to close")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(feedback, feedback_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBase;
    use crate::responder::Responder;
    use crate::storage::Storage;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn test_app(dir: &std::path::Path) -> App {
        let storage = Storage::at(dir).unwrap();
        let responder = Responder::with_seed(KnowledgeBase::builtin(), 7);
        App::with_services(storage, responder)
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_shows_header_and_greeting() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());

        let rendered = draw(&mut app, 80, 24);
        assert!(rendered.contains("GPTsim"));
        assert!(rendered.contains(GREETING));
    }

    #[test]
    fn test_render_survives_tiny_terminals() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.store.push_user("a".repeat(120));
        app.store.push_assistant("short reply");

        for size in 1..=12 {
            draw(&mut app, size, size);
        }
    }

    #[test]
    fn test_quiz_popup_renders_at_normal_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.open_quiz();

        let rendered = draw(&mut app, 80, 24);
        assert!(rendered.contains("Psychology Quiz"));
    }

    #[test]
    fn test_quiz_popup_shows_feedback_after_answer() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.open_quiz();
        app.quiz_confirm();

        let rendered = draw(&mut app, 80, 24);
        assert!(rendered.contains("Incorrect. The answer is"));
    }

    #[test]
    fn test_quiz_popup_clipped_on_short_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.open_quiz();
        assert!(app.quiz.question.is_some());

        // The popup wants ten rows; every shorter terminal must clip it
        for height in 1..=9 {
            draw(&mut app, 40, height);
        }
        for width in 1..=9 {
            draw(&mut app, width, 24);
        }
    }
}
