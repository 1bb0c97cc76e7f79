use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, Focus};
use crate::tui::AppEvent;

const WHEEL_LINES: u16 = 3;

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
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Detected(result) => {
            app.session.settle(result);
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any field
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::BackTab => {
            app.focus = match app.focus {
                Focus::ApiKey => Focus::Question,
                Focus::Question => Focus::ApiKey,
            };
        }
        KeyCode::PageUp => {
            let page = app.viewport().height.max(1);
            app.viewport_mut().scroll_up(page);
        }
        KeyCode::PageDown => {
            let page = app.viewport().height.max(1);
            app.viewport_mut().scroll_down(page);
        }
        KeyCode::Enter => match app.focus {
            Focus::ApiKey => app.focus = Focus::Question,
            Focus::Question => app.send(),
        },
        _ => match app.focus {
            Focus::ApiKey => {
                let App { session, api_key_cursor, .. } = app;
                edit_text(session.api_key_mut(), api_key_cursor, key);
            }
            Focus::Question => {
                let App { session, draft_cursor, .. } = app;
                edit_text(session.draft_mut(), draft_cursor, key);
            }
        },
    }
}

/// Apply a cursor-editing key to a single-line field.
fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = char_count;
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.viewport_mut().scroll_up(WHEEL_LINES),
        MouseEventKind::ScrollDown => app.viewport_mut().scroll_down(WHEEL_LINES),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::tests::{dead_endpoint, serve_once};
    use crate::detect::DetectClient;
    use crate::navigator::Screen;
    use crate::session::{Sender, CONNECTION_FAILED, MISSING_API_KEY};
    use tokio::sync::mpsc;

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, press(KeyCode::Char(c))).unwrap();
        }
    }

    fn test_app(endpoint: &str) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(Screen::Chat, DetectClient::new(endpoint), tx), rx)
    }

    #[test]
    fn editing_is_char_aware() {
        let mut text = String::from("héllo");
        let mut cursor = 5;

        edit_text(&mut text, &mut cursor, KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        edit_text(&mut text, &mut cursor, KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        edit_text(&mut text, &mut cursor, KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        edit_text(&mut text, &mut cursor, KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(text, "hllo");
        assert_eq!(cursor, 1);

        edit_text(&mut text, &mut cursor, KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE));
        edit_text(&mut text, &mut cursor, KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE));
        assert_eq!(text, "helo");

        edit_text(&mut text, &mut cursor, KeyEvent::new(KeyCode::End, KeyModifiers::NONE));
        assert_eq!(cursor, 4);
    }

    #[tokio::test]
    async fn enter_without_key_posts_system_message() {
        let (mut app, _rx) = test_app(&dead_endpoint().await);
        handle_event(&mut app, press(KeyCode::Tab)).unwrap();
        type_text(&mut app, "what is pi?");
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();

        assert_eq!(app.session.messages().len(), 1);
        assert_eq!(app.session.messages()[0].sender, Sender::System);
        assert_eq!(app.session.messages()[0].text, MISSING_API_KEY);
        assert_eq!(app.session.draft(), "what is pi?");
        assert_eq!(app.focus, Focus::ApiKey);
    }

    #[tokio::test]
    async fn enter_in_key_field_moves_to_question() {
        let (mut app, _rx) = test_app(&dead_endpoint().await);
        type_text(&mut app, "key-123");
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();

        assert_eq!(app.session.api_key(), "key-123");
        assert_eq!(app.focus, Focus::Question);
        assert!(app.session.messages().is_empty());
    }

    #[tokio::test]
    async fn send_round_trip_through_event_loop() {
        let (url, _server) = serve_once("200 OK", r#"{"category":"Algebra"}"#).await;
        let (mut app, mut rx) = test_app(&url);

        type_text(&mut app, "key-123");
        handle_event(&mut app, press(KeyCode::Tab)).unwrap();
        type_text(&mut app, "2x + 1 = 7");
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();

        assert!(app.session.is_pending());
        assert_eq!(app.session.draft(), "");
        assert_eq!(app.draft_cursor, 0);

        // A second Enter while pending is ignored
        type_text(&mut app, "again");
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        assert_eq!(app.session.messages().len(), 1);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::Detected(_)));
        handle_event(&mut app, event).unwrap();

        let texts: Vec<&str> = app.session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["2x + 1 = 7", "Algebra"]);
        assert!(!app.session.is_pending());
        assert_eq!(app.session.draft(), "again");
    }

    #[tokio::test]
    async fn unreachable_backend_reports_connection_error() {
        let (mut app, mut rx) = test_app(&dead_endpoint().await);
        type_text(&mut app, "k");
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        type_text(&mut app, "q");
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();

        let event = rx.recv().await.unwrap();
        handle_event(&mut app, event).unwrap();

        let last = app.session.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        assert_eq!(last.text, CONNECTION_FAILED);
    }

    #[tokio::test]
    async fn ctrl_c_and_esc_quit() {
        let (mut app, _rx) = test_app(&dead_endpoint().await);
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        )
        .unwrap();
        assert!(app.should_quit);

        let (mut app, _rx) = test_app(&dead_endpoint().await);
        handle_event(&mut app, press(KeyCode::Esc)).unwrap();
        assert!(app.should_quit);
    }
}
