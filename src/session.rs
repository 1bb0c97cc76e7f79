//! UI-agnostic chat session state
//!
//! Holds the draft question, the API key, the message log and the pending
//! flag. The terminal screen and the one-shot CLI both drive the same
//! session; neither owns any chat logic of its own.

use tracing::{error, info, warn};

use crate::detect::{DetectClient, DetectError, DetectRequest, DetectResponse};

pub const MISSING_API_KEY: &str = "⚠️ Please enter your API key.";
pub const CONNECTION_FAILED: &str = "❌ Error connecting to backend";
pub const UNKNOWN_BACKEND_ERROR: &str = "❌ Unknown backend error";
pub const NO_RESPONSE_DETECTED: &str = "No response detected";

/// Who a message in the log came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
    System,
}

/// One entry of the message log. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

/// Hook run after every append to the message log.
pub trait LogObserver {
    fn log_changed(&mut self, messages: &[Message]);
}

impl LogObserver for () {
    fn log_changed(&mut self, _messages: &[Message]) {}
}

/// What a call to [`ChatSession::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// No key entered; a system message was appended.
    MissingApiKey,
    /// Nothing to send; the session is unchanged.
    EmptyQuestion,
    /// The question was logged and the request must now be sent.
    Dispatched(DetectRequest),
}

pub struct ChatSession<O = ()> {
    draft: String,
    api_key: String,
    messages: Vec<Message>,
    pending: bool,
    observer: O,
}

impl<O: LogObserver> ChatSession<O> {
    pub fn new(observer: O) -> Self {
        Self {
            draft: String::new(),
            api_key: String::new(),
            messages: Vec::new(),
            pending: false,
            observer,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_key_mut(&mut self) -> &mut String {
        &mut self.api_key
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Gate for the send action. Advisory: `submit` itself does not check it.
    pub fn can_submit(&self) -> bool {
        !self.pending && !self.draft.trim().is_empty()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Validate the current key and draft and, if both are present, log the
    /// question, clear the draft and mark the session pending.
    ///
    /// The key is checked before the question, so an empty key is reported
    /// even when the draft is empty too.
    pub fn submit(&mut self) -> Submission {
        if self.api_key.trim().is_empty() {
            self.push(Sender::System, MISSING_API_KEY.to_string());
            return Submission::MissingApiKey;
        }
        if self.draft.trim().is_empty() {
            return Submission::EmptyQuestion;
        }

        let question = std::mem::take(&mut self.draft);
        let request = DetectRequest::new(&self.api_key, &question);
        self.push(Sender::User, question);
        self.pending = true;

        Submission::Dispatched(request)
    }

    /// Record the outcome of a dispatched request and clear the pending flag.
    pub fn settle(&mut self, result: Result<DetectResponse, DetectError>) -> &Message {
        let reply = reply_text(result);
        self.push(Sender::Bot, reply);
        self.pending = false;

        // push just appended, so the log is non-empty
        &self.messages[self.messages.len() - 1]
    }

    /// Submit and wait for the request in one step.
    pub async fn submit_with(&mut self, client: &DetectClient) -> Submission {
        let submission = self.submit();
        if let Submission::Dispatched(request) = &submission {
            let result = client.detect(request).await;
            self.settle(result);
        }
        submission
    }

    fn push(&mut self, sender: Sender, text: String) {
        self.messages.push(Message { sender, text });
        self.observer.log_changed(&self.messages);
    }
}

/// Text shown for the outcome of a detect request.
pub fn reply_text(result: Result<DetectResponse, DetectError>) -> String {
    match result {
        Ok(response) if response.is_success() => {
            let category = response.category().unwrap_or(NO_RESPONSE_DETECTED);
            info!(category, "topic detected");
            category.to_string()
        }
        Ok(response) => {
            warn!(status = %response.status, detail = ?response.detail(), "detect request rejected");
            response
                .detail()
                .unwrap_or(UNKNOWN_BACKEND_ERROR)
                .to_string()
        }
        Err(e) => {
            error!(error = %e, "detect request failed");
            CONNECTION_FAILED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::tests::{dead_endpoint, serve_once};
    use reqwest::StatusCode;
    use serde_json::json;

    #[derive(Default)]
    struct CountingObserver {
        calls: usize,
        last_len: usize,
    }

    impl LogObserver for CountingObserver {
        fn log_changed(&mut self, messages: &[Message]) {
            self.calls += 1;
            self.last_len = messages.len();
        }
    }

    fn response(status: StatusCode, body: serde_json::Value) -> Result<DetectResponse, DetectError> {
        Ok(DetectResponse { status, body })
    }

    fn ready_session() -> ChatSession<CountingObserver> {
        let mut session = ChatSession::new(CountingObserver::default());
        session.set_api_key("key-123");
        session.set_draft("solve x + 2 = 5");
        session
    }

    #[test]
    fn empty_key_appends_one_system_message() {
        let mut session = ChatSession::new(CountingObserver::default());
        session.set_draft("what is a derivative?");

        assert_eq!(session.submit(), Submission::MissingApiKey);
        assert_eq!(
            session.messages(),
            &[Message { sender: Sender::System, text: MISSING_API_KEY.to_string() }]
        );
        assert_eq!(session.draft(), "what is a derivative?");
        assert!(!session.is_pending());
        assert_eq!(session.observer().calls, 1);
    }

    #[test]
    fn key_is_checked_before_question() {
        let mut session = ChatSession::new(());
        assert_eq!(session.submit(), Submission::MissingApiKey);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn whitespace_key_counts_as_missing() {
        let mut session = ChatSession::new(());
        session.set_api_key("   ");
        session.set_draft("q");
        assert_eq!(session.submit(), Submission::MissingApiKey);
    }

    #[test]
    fn empty_question_is_a_silent_no_op() {
        let mut session = ChatSession::new(CountingObserver::default());
        session.set_api_key("key-123");
        session.set_draft("   ");

        assert_eq!(session.submit(), Submission::EmptyQuestion);
        assert!(session.messages().is_empty());
        assert!(!session.is_pending());
        assert_eq!(session.draft(), "   ");
        assert_eq!(session.observer().calls, 0);
    }

    #[test]
    fn valid_submit_logs_question_and_clears_draft() {
        let mut session = ready_session();

        let submission = session.submit();
        assert_eq!(
            submission,
            Submission::Dispatched(DetectRequest::new("key-123", "solve x + 2 = 5"))
        );
        assert_eq!(session.draft(), "");
        assert!(session.is_pending());
        assert!(!session.can_submit());
        assert_eq!(
            session.messages(),
            &[Message { sender: Sender::User, text: "solve x + 2 = 5".to_string() }]
        );
        assert_eq!(session.observer().last_len, 1);
    }

    #[test]
    fn question_is_sent_untrimmed() {
        let mut session = ChatSession::new(());
        session.set_api_key("k");
        session.set_draft("  padded ");

        match session.submit() {
            Submission::Dispatched(request) => assert_eq!(request.question, "  padded "),
            other => panic!("unexpected submission: {:?}", other),
        }
    }

    #[test]
    fn success_uses_category() {
        let mut session = ready_session();
        session.submit();

        let reply = session.settle(response(StatusCode::OK, json!({ "category": "Algebra" })));
        assert_eq!(reply, &Message { sender: Sender::Bot, text: "Algebra".to_string() });
        assert!(!session.is_pending());
    }

    #[test]
    fn success_without_category_uses_fallback() {
        let mut session = ready_session();
        session.submit();

        let reply = session.settle(response(StatusCode::OK, json!({})));
        assert_eq!(reply.text, NO_RESPONSE_DETECTED);
    }

    #[test]
    fn rejection_uses_detail() {
        let mut session = ready_session();
        session.submit();

        let reply = session.settle(response(StatusCode::UNAUTHORIZED, json!({ "detail": "Invalid key" })));
        assert_eq!(reply.text, "Invalid key");
        assert!(!session.is_pending());
    }

    #[test]
    fn rejection_without_detail_uses_generic_error() {
        let mut session = ready_session();
        session.submit();

        let reply = session.settle(response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "category": "Algebra" })));
        assert_eq!(reply.text, UNKNOWN_BACKEND_ERROR);
    }

    #[test]
    fn non_200_success_codes_are_rejections() {
        let mut session = ready_session();
        session.submit();

        let reply = session.settle(response(StatusCode::CREATED, json!({ "category": "Algebra" })));
        assert_eq!(reply.text, UNKNOWN_BACKEND_ERROR);
    }

    #[tokio::test]
    async fn transport_failure_uses_fixed_message() {
        let client = DetectClient::new(&dead_endpoint().await);
        let mut session = ready_session();

        let submission = session.submit_with(&client).await;
        assert!(matches!(submission, Submission::Dispatched(_)));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(
            session.messages()[1],
            Message { sender: Sender::Bot, text: CONNECTION_FAILED.to_string() }
        );
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn submit_with_makes_exactly_one_call() {
        let (url, server) = serve_once("200 OK", r#"{"category":"Geometry"}"#).await;
        let client = DetectClient::new(&url);
        let mut session = ready_session();

        session.submit_with(&client).await;
        server.await.unwrap();

        let texts: Vec<&str> = session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["solve x + 2 = 5", "Geometry"]);
        assert_eq!(session.observer().calls, 2);
    }

    #[tokio::test]
    async fn input_errors_make_no_call() {
        let client = DetectClient::new(&dead_endpoint().await);

        let mut no_key = ChatSession::new(());
        no_key.set_draft("q");
        assert_eq!(no_key.submit_with(&client).await, Submission::MissingApiKey);
        assert_eq!(no_key.messages().len(), 1);

        let mut no_question = ChatSession::new(());
        no_question.set_api_key("k");
        assert_eq!(no_question.submit_with(&client).await, Submission::EmptyQuestion);
        assert!(no_question.messages().is_empty());
    }

    #[test]
    fn log_is_append_only_across_submissions() {
        let mut session = ChatSession::new(());
        session.set_api_key("k");
        let outcomes = [
            response(StatusCode::OK, json!({ "category": "Algebra" })),
            response(StatusCode::FORBIDDEN, json!({ "detail": "Quota exceeded" })),
            response(StatusCode::OK, json!({})),
        ];

        let mut previous: Vec<Message> = Vec::new();
        for (i, outcome) in outcomes.into_iter().enumerate() {
            session.set_draft(format!("question {}", i));
            session.submit();
            session.settle(outcome);

            let log = session.messages();
            assert!(log.len() > previous.len());
            assert_eq!(&log[..previous.len()], previous.as_slice());
            previous = log.to_vec();
        }

        let texts: Vec<&str> = previous.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "question 0",
                "Algebra",
                "question 1",
                "Quota exceeded",
                "question 2",
                NO_RESPONSE_DETECTED,
            ]
        );
    }

    #[test]
    fn draft_stays_cleared_whatever_the_outcome() {
        let mut session = ready_session();
        session.submit();
        assert_eq!(session.draft(), "");

        session.settle(response(StatusCode::BAD_REQUEST, json!({ "detail": "nope" })));
        assert_eq!(session.draft(), "");
    }
}
