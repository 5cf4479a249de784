use bank_chat_core::{BackendClient, BackendError, ChatResponse, Conversation, PendingSend};
use tokio::task::JoinHandle;

/// Starter questions offered on the empty welcome screen
pub const SUGGESTIONS: [&str; 4] = [
    "What are your savings account rates?",
    "How do I open a checking account?",
    "Tell me about auto loans",
    "What should I do if my card is stolen?",
];

type ReplyTask = JoinHandle<Result<ChatResponse, BackendError>>;

pub struct App {
    pub should_quit: bool,

    // Conversation state (the only thing the chat view renders from)
    pub conversation: Conversation,
    pub client: BackendClient,
    pub reply_task: Option<(PendingSend, ReplyTask)>,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub suggestion_idx: Option<usize>,

    // Chat scroll state (dimensions updated during render)
    pub scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16,
    pub chat_width: u16,
    pub total_chat_lines: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for typing indicator
}

impl App {
    pub fn new(client: BackendClient) -> Self {
        Self::with_conversation(client, Conversation::new())
    }

    pub fn with_conversation(client: BackendClient, conversation: Conversation) -> Self {
        Self {
            should_quit: false,
            conversation,
            client,
            reply_task: None,
            input: String::new(),
            cursor: 0,
            suggestion_idx: None,
            scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,
            animation_frame: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    /// Send whatever is in the input box. Blank input and input typed while a
    /// reply is pending are left where they are.
    pub fn submit_input(&mut self) {
        if self.input.trim().is_empty() || self.is_loading() {
            return;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.suggestion_idx = None;
        self.send(text);
    }

    /// Record the message and hand the HTTP call to a background task.
    pub fn send(&mut self, text: String) {
        let pending = match self.conversation.begin_send(&text) {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring send while a reply is pending");
                return;
            }
        };

        let client = self.client.clone();
        let message = pending.message().to_string();
        let session_id = pending.session_id().map(str::to_string);
        let task = tokio::spawn(async move {
            client.send_message(&message, session_id.as_deref()).await
        });

        self.reply_task = Some((pending, task));
        self.follow_tail = true;
    }

    /// Apply the reply if the background request has finished.
    pub async fn poll_reply(&mut self) -> bool {
        let finished = self
            .reply_task
            .as_ref()
            .is_some_and(|(_, task)| task.is_finished());
        if !finished {
            return false;
        }

        let Some((pending, task)) = self.reply_task.take() else {
            return false;
        };

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(BackendError::Aborted(e.to_string())),
        };
        self.conversation.complete(pending, result);
        self.follow_tail = true;
        true
    }

    /// Start over. A reply still on its way is left to finish and discarded.
    pub fn clear_chat(&mut self) {
        self.conversation.clear_chat();
        self.reply_task = None;
        self.scroll = 0;
        self.follow_tail = true;
        self.suggestion_idx = None;
    }

    /// Fill the input with the next starter question (welcome screen only).
    pub fn cycle_suggestion(&mut self) {
        if !self.conversation.is_empty() || self.is_loading() {
            return;
        }

        let next = self
            .suggestion_idx
            .map_or(0, |idx| (idx + 1) % SUGGESTIONS.len());
        self.suggestion_idx = Some(next);
        self.input = SUGGESTIONS[next].to_string();
        self.cursor = self.input.chars().count();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
        if self.scroll >= self.max_scroll() {
            self.follow_tail = true;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.scroll = self.max_scroll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_chat_core::{ChatRole, ERROR_REPLY};
    use std::time::Duration;

    async fn unreachable_client() -> BackendClient {
        // Bind then drop a listener so the port is known to be closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        BackendClient::new(&format!("http://{}/api/v1", addr)).unwrap()
    }

    async fn wait_for_reply(app: &mut App) {
        for _ in 0..200 {
            if app.poll_reply().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reply never arrived");
    }

    #[tokio::test]
    async fn test_blank_input_is_not_sent() {
        let mut app = App::new(unreachable_client().await);
        app.input = "   ".to_string();

        app.submit_input();

        assert!(app.conversation.is_empty());
        assert!(app.reply_task.is_none());
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn test_submit_records_message_and_clears_input() {
        let mut app = App::new(unreachable_client().await);
        app.input = "Tell me about auto loans".to_string();
        app.cursor = app.input.chars().count();

        app.submit_input();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_loading());
        assert_eq!(app.conversation.messages()[0].content, "Tell me about auto loans");
        assert!(app.reply_task.is_some());
    }

    #[tokio::test]
    async fn test_input_kept_while_waiting() {
        let mut app = App::new(unreachable_client().await);
        app.input = "first".to_string();
        app.submit_input();

        app.input = "second".to_string();
        app.submit_input();

        assert_eq!(app.input, "second");
        assert_eq!(app.conversation.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_reply_becomes_error_message() {
        let mut app = App::new(unreachable_client().await);
        app.send("hello".to_string());

        wait_for_reply(&mut app).await;

        let messages = app.conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert!(messages[1].error);
        assert_eq!(messages[1].content, ERROR_REPLY);
        assert!(!app.is_loading());
        assert!(app.reply_task.is_none());
    }

    #[tokio::test]
    async fn test_clear_while_waiting_frees_input() {
        let mut app = App::new(unreachable_client().await);
        app.send("hello".to_string());

        app.clear_chat();

        assert!(app.conversation.is_empty());
        assert!(!app.is_loading());
        assert!(app.reply_task.is_none());
        assert!(!app.poll_reply().await);
    }

    #[tokio::test]
    async fn test_suggestions_cycle_on_welcome_screen() {
        let mut app = App::new(unreachable_client().await);

        app.cycle_suggestion();
        assert_eq!(app.input, SUGGESTIONS[0]);
        app.cycle_suggestion();
        assert_eq!(app.input, SUGGESTIONS[1]);
        assert_eq!(app.cursor, SUGGESTIONS[1].chars().count());

        for _ in 0..3 {
            app.cycle_suggestion();
        }
        assert_eq!(app.input, SUGGESTIONS[0]);
    }

    #[tokio::test]
    async fn test_suggestions_disabled_once_chatting() {
        let mut app = App::new(unreachable_client().await);
        app.send("hi".to_string());

        app.cycle_suggestion();

        assert!(app.input.is_empty());
    }

    #[tokio::test]
    async fn test_scrolling_up_stops_following() {
        let mut app = App::new(unreachable_client().await);
        app.total_chat_lines = 50;
        app.chat_height = 10;
        app.scroll_to_bottom();
        assert_eq!(app.scroll, 40);

        app.scroll_up(5);
        assert!(!app.follow_tail);
        assert_eq!(app.scroll, 35);

        app.scroll_down(100);
        assert_eq!(app.scroll, 40);
        assert!(app.follow_tail);
    }
}
