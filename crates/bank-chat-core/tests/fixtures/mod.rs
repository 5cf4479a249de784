use serde_json::json;
use wiremock::matchers::*;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock support backend mounted under `/api/v1`
pub struct BackendMockServer {
    server: MockServer,
}

impl BackendMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}/api/v1", self.server.uri())
    }

    /// Answer any chat request whose body contains `request_fields`.
    pub async fn mock_chat(&self, request_fields: serde_json::Value, response: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(request_fields))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_chat_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "detail": "Error processing request: upstream model unavailable"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_chat_malformed(&self) {
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_chat_slow(&self, delay: std::time::Duration) {
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"answer": "too late"}))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_health(&self) {
        Mock::given(method("GET"))
            .and(path("/api/v1/health/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "healthy",
                "service": "Bank Support AI",
                "environment": "development"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_history(&self, session_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/chat/history/{}", session_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": session_id,
                "history": [
                    {"role": "user", "content": "What are your savings account rates?"},
                    {"role": "assistant", "content": "Our savings rate is 4.5% APY."}
                ]
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_end_session(&self, session_id: &str) {
        Mock::given(method("DELETE"))
            .and(path(format!("/api/v1/chat/session/{}", session_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": format!("Session {} cleared successfully", session_id)
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}
