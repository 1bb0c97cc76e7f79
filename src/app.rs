use tokio::sync::mpsc;

use crate::detect::DetectClient;
use crate::navigator::Screen;
use crate::session::{ChatSession, LogObserver, Message, Submission};
use crate::tui::AppEvent;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    ApiKey,
    Question,
}

/// Scroll state of the message log. Follows the newest message until the
/// user scrolls away from the bottom.
#[derive(Debug, Clone, Default)]
pub struct ChatViewport {
    pub scroll: u16,
    pub height: u16, // inner height of the chat area
    pub width: u16,  // inner width, for wrap calculations
    pub total_lines: u16,
    pub follow: bool,
}

impl ChatViewport {
    fn max_scroll(&self) -> u16 {
        self.total_lines.saturating_sub(self.height)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
        self.follow = true;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow = self.scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
        self.follow = self.scroll >= self.max_scroll();
    }

    /// Called on every draw with the current area and content size.
    pub fn update(&mut self, height: u16, width: u16, total_lines: u16) {
        self.height = height;
        self.width = width;
        self.total_lines = total_lines;
        if self.follow {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }
}

impl LogObserver for ChatViewport {
    fn log_changed(&mut self, messages: &[Message]) {
        // Measured with the pending indicator so a fresh question is
        // followed by a visible "Detecting..." line. The next draw
        // re-measures against the real state.
        self.total_lines = ui::log_height(messages, true, self.width);
        self.scroll_to_bottom();
    }
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub focus: Focus,

    pub session: ChatSession<ChatViewport>,
    pub api_key_cursor: usize,
    pub draft_cursor: usize,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub client: DetectClient,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(screen: Screen, client: DetectClient, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            screen,
            focus: Focus::ApiKey,
            session: ChatSession::new(ChatViewport { follow: true, ..Default::default() }),
            api_key_cursor: 0,
            draft_cursor: 0,
            animation_frame: 0,
            client,
            events,
        }
    }

    pub fn viewport(&self) -> &ChatViewport {
        self.session.observer()
    }

    pub fn viewport_mut(&mut self) -> &mut ChatViewport {
        self.session.observer_mut()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Send the current draft. Ignored while a request is outstanding.
    pub fn send(&mut self) {
        if self.session.is_pending() {
            return;
        }

        match self.session.submit() {
            Submission::MissingApiKey => {
                self.focus = Focus::ApiKey;
            }
            Submission::EmptyQuestion => {}
            Submission::Dispatched(request) => {
                self.draft_cursor = 0;
                self.animation_frame = 0;

                let client = self.client.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = client.detect(&request).await;
                    // The receiver is gone only when the app is shutting down
                    let _ = events.send(AppEvent::Detected(result));
                });
            }
        }
    }
}
