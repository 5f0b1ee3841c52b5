use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_reply().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global: Ctrl-C quits from any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // The quiz popup swallows all keys while open
    if app.show_quiz {
        handle_quiz_key(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Editing => handle_editing_key(app, key),
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Cycle focus: Sidebar -> Chat -> Input
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Sidebar => FocusPane::Chat,
                FocusPane::Chat => FocusPane::Input,
                FocusPane::Input => FocusPane::Sidebar,
            };
            if app.focus == FocusPane::Input {
                enter_editing(app);
            }
        }

        // Navigation / scrolling
        KeyCode::Char('j') | KeyCode::Down => {
            if app.focus == FocusPane::Sidebar {
                app.sidebar_nav_down();
            } else {
                app.scroll_down();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.focus == FocusPane::Sidebar {
                app.sidebar_nav_up();
            } else {
                app.scroll_up();
            }
        }
        KeyCode::Char('g') => {
            if app.focus == FocusPane::Sidebar {
                app.sidebar_nav_first();
            } else {
                app.chat_scroll = 0;
            }
        }
        KeyCode::Char('G') => {
            if app.focus == FocusPane::Sidebar {
                app.sidebar_nav_last();
            } else {
                app.scroll_chat_to_bottom();
            }
        }

        // Open the highlighted conversation
        KeyCode::Enter => {
            if app.focus == FocusPane::Sidebar {
                app.open_selected();
            }
        }

        // Conversation actions
        KeyCode::Char('n') => app.start_new_chat(),
        KeyCode::Char('c') => app.clear_active_chat(),
        KeyCode::Char('d') => {
            if app.focus == FocusPane::Sidebar {
                app.delete_selected();
            }
        }

        KeyCode::Char('Q') => app.open_quiz(),

        // Start typing a message
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.focus = FocusPane::Input;
            enter_editing(app);
        }

        _ => {}
    }
}

fn enter_editing(app: &mut App) {
    app.input_mode = InputMode::Editing;
    app.input_cursor = app.input.chars().count();
}

fn handle_editing_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Chat;
        }
        KeyCode::Enter => app.submit_message(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.input_cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.input_cursor = (app.input_cursor + 1).min(app.input.chars().count());
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_quiz_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_quiz(),
        KeyCode::Char('j') | KeyCode::Down => app.quiz_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.quiz_nav_up(),
        KeyCode::Enter => app.quiz_confirm(),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_sidebar = app
        .sidebar_area
        .map(|rect| point_in_rect(x, y, rect))
        .unwrap_or(false);
    let in_chat = app
        .chat_area
        .map(|rect| point_in_rect(x, y, rect))
        .unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.sidebar_nav_down();
            } else if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_add(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.sidebar_nav_up();
            } else if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_sub(3);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBase;
    use crate::responder::Responder;
    use crate::storage::Storage;

    #[test]
    fn test_char_to_byte_index_ascii() {
        assert_eq!(char_to_byte_index("hello", 0), 0);
        assert_eq!(char_to_byte_index("hello", 3), 3);
        assert_eq!(char_to_byte_index("hello", 9), 5);
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        // 'é' is two bytes in UTF-8
        assert_eq!(char_to_byte_index("héllo", 1), 1);
        assert_eq!(char_to_byte_index("héllo", 2), 3);
    }

    #[test]
    fn test_point_in_rect_bounds() {
        let rect = Rect::new(2, 2, 4, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 4, rect));
        assert!(!point_in_rect(6, 2, rect));
        assert!(!point_in_rect(2, 5, rect));
    }

    #[tokio::test]
    async fn test_resize_event_leaves_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path()).unwrap();
        let responder = Responder::with_seed(KnowledgeBase::builtin(), 7);
        let mut app = App::with_services(storage, responder);

        handle_event(&mut app, AppEvent::Resize(120, 40)).await.unwrap();

        assert!(!app.should_quit);
        assert_eq!(app.store.len(), 1);
    }
}
