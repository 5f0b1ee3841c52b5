use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::knowledge::{KnowledgeBase, QuizQuestion};
use crate::responder::Responder;
use crate::storage::Storage;

/// Assistant line appended when the reply task itself fails.
pub const ERROR_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Greeting rendered in an empty conversation. Never stored.
pub const GREETING: &str = "Hello! How can I assist you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Chat,
    Input,
}

/// Quiz popup state: the drawn question plus the highlighted and the
/// answered option.
pub struct QuizState {
    pub question: Option<QuizQuestion>,
    pub options_state: ListState,
    pub answered: Option<usize>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation state
    pub store: ConversationStore,
    pub sidebar_state: ListState,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner chat area size for scroll calculations
    pub chat_width: u16,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Pending reply
    pub reply_task: Option<JoinHandle<String>>,
    pub reply_loading: bool,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Quiz popup state
    pub show_quiz: bool,
    pub quiz: QuizState,

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    // Services
    pub responder: Responder,
    pub storage: Storage,
}

impl App {
    /// Assemble the controller from the user config.
    pub async fn new(config: Config, storage: Storage) -> Self {
        let kb = KnowledgeBase::load_with_fallback(config.knowledge_base.as_deref()).await;
        let responder =
            Responder::new(kb).with_delays(config.reply_delay(), config.fallback_delay());

        let app = Self::with_services(storage, responder);
        // A fresh install gets its files on the first launch, not the
        // first message
        app.persist();
        app
    }

    /// Build the controller around explicit services (tests pass a seeded
    /// responder and a temp directory).
    pub fn with_services(storage: Storage, responder: Responder) -> Self {
        let store = storage.load();

        let mut sidebar_state = ListState::default();
        sidebar_state.select(store.active_index());

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            store,
            sidebar_state,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            input: String::new(),
            input_cursor: 0,

            reply_task: None,
            reply_loading: false,
            animation_frame: 0,

            show_quiz: false,
            quiz: QuizState {
                question: None,
                options_state: ListState::default(),
                answered: None,
            },

            sidebar_area: None,
            chat_area: None,

            responder,
            storage,
        }
    }

    // Conversation actions

    /// Append a fresh conversation and switch to it.
    pub fn start_new_chat(&mut self) {
        self.store.start_new();
        self.follow_active();
        self.persist();
    }

    /// Switch to the conversation highlighted in the sidebar.
    pub fn open_selected(&mut self) {
        if let Some(index) = self.sidebar_state.selected() {
            self.store.activate(index);
            self.follow_active();
            self.persist();
        }
    }

    /// Delete the conversation highlighted in the sidebar.
    pub fn delete_selected(&mut self) {
        if let Some(index) = self.sidebar_state.selected() {
            self.store.delete(index);
            self.follow_active();
            self.persist();
        }
    }

    /// Reset the active conversation to its system prompt.
    pub fn clear_active_chat(&mut self) {
        self.store.clear_active();
        self.chat_scroll = 0;
        self.persist();
    }

    /// Move the sidebar highlight onto the active conversation and show
    /// the end of its history.
    fn follow_active(&mut self) {
        self.sidebar_state.select(self.store.active_index());
        self.scroll_chat_to_bottom();
    }

    /// Submit the input box as a user message and spawn the reply task.
    /// Ignored while a reply is pending or when the input is blank.
    pub fn submit_message(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.reply_task.is_some() || self.store.active().is_none() {
            return;
        }

        self.input.clear();
        self.input_cursor = 0;

        self.store.push_user(text.as_str());
        self.persist();

        let reply = self.responder.compose(&text);
        self.reply_loading = true;
        self.scroll_chat_to_bottom();

        self.reply_task = Some(tokio::spawn(async move {
            tokio::time::sleep(reply.delay).await;
            reply.text
        }));
    }

    /// Harvest the pending reply once its simulated latency has elapsed.
    /// Called on every tick; a failed task turns into the error reply.
    pub async fn poll_reply(&mut self) {
        let finished = self
            .reply_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.reply_task.take() {
            let text = match task.await {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "reply task failed");
                    ERROR_REPLY.to_string()
                }
            };
            self.store.push_assistant(text);
            self.reply_loading = false;
            self.persist();
            self.scroll_chat_to_bottom();
        }
    }

    /// Write the store through to disk. Failures are logged, never fatal.
    pub fn persist(&self) {
        if let Err(err) = self.storage.save(&self.store) {
            tracing::warn!(error = %err, "failed to persist conversations");
        }
    }

    // Sidebar navigation

    pub fn sidebar_nav_down(&mut self) {
        let len = self.store.len();
        if len > 0 {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn sidebar_nav_up(&mut self) {
        let i = self.sidebar_state.selected().unwrap_or(0);
        self.sidebar_state.select(Some(i.saturating_sub(1)));
    }

    pub fn sidebar_nav_first(&mut self) {
        if !self.store.is_empty() {
            self.sidebar_state.select(Some(0));
        }
    }

    pub fn sidebar_nav_last(&mut self) {
        let len = self.store.len();
        if len > 0 {
            self.sidebar_state.select(Some(len - 1));
        }
    }

    // Chat scrolling

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll so the latest message, or the typing indicator, is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        if let Some(conversation) = self.store.active() {
            for msg in conversation.visible_messages() {
                total_lines += 1; // Role line ("You:" or "GPTsim:")
                for line in msg.content.lines() {
                    // Character count, not byte length, for proper UTF-8 handling
                    let char_count = line.chars().count();
                    if char_count == 0 {
                        total_lines += 1;
                    } else {
                        total_lines += ((char_count / wrap_width) + 1) as u16;
                    }
                }
                total_lines += 1; // Blank line after message
            }
        }

        if self.reply_loading {
            total_lines += 2; // Role line + typing indicator
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.reply_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Quiz popup

    /// Open the quiz popup with a freshly drawn question.
    pub fn open_quiz(&mut self) {
        self.quiz.question = self.responder.quiz_question();
        self.quiz.answered = None;
        self.quiz.options_state = ListState::default();
        if self.quiz.question.is_some() {
            self.quiz.options_state.select(Some(0));
        }
        self.show_quiz = true;
    }

    pub fn close_quiz(&mut self) {
        self.show_quiz = false;
    }

    pub fn quiz_nav_down(&mut self) {
        let len = self
            .quiz
            .question
            .as_ref()
            .map(|q| q.options.len())
            .unwrap_or(0);
        if len > 0 {
            let i = self.quiz.options_state.selected().unwrap_or(0);
            self.quiz.options_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn quiz_nav_up(&mut self) {
        let i = self.quiz.options_state.selected().unwrap_or(0);
        self.quiz.options_state.select(Some(i.saturating_sub(1)));
    }

    /// Lock in the highlighted option, or draw the next question once
    /// the current one is answered.
    pub fn quiz_confirm(&mut self) {
        if self.quiz.answered.is_some() {
            self.open_quiz();
        } else if self.quiz.question.is_some() {
            self.quiz.answered = self.quiz.options_state.selected();
        }
    }
}
