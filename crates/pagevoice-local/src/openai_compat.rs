use crate::config::GatewayConfig;
use pagevoice_core::{Error, RemoteReply, Result, SummaryBackend, SummaryRequest};
use serde::{Deserialize, Serialize};

pub const SUMMARY_TEMPERATURE: f64 = 0.3;
pub const SUMMARY_MAX_TOKENS: u64 = 200;

#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl std::fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("base_url", &self.base_url)
            .field("api_key_present", &self.api_key.is_some())
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompatClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }

    /// Requires an API key and a valid base URL.
    pub fn from_config(cfg: &GatewayConfig) -> Result<Self> {
        let base = cfg.validated_base_url()?;
        let api_key = cfg.api_key.clone().ok_or_else(|| {
            Error::NotConfigured(
                "missing PAGEVOICE_OPENAI_COMPAT_API_KEY (or OPENAI_API_KEY)".to_string(),
            )
        })?;
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = cfg.timeout_ms {
            builder = builder.timeout(std::time::Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| Error::NotConfigured(format!("http client: {e}")))?;
        Ok(Self::new(
            client,
            base.as_str().to_string(),
            Some(api_key),
            cfg.model.clone(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    /// One non-streaming chat completion.
    ///
    /// Transport failures are `Err(Transport)`. An answer that carries an error payload
    /// (or a non-2xx status) is `Ok(Rejected)`; a 2xx body that is not JSON is
    /// `Err(Malformed)`.
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: Option<u64>,
        temperature: Option<f64>,
    ) -> Result<RemoteReply> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature,
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let parsed = serde_json::from_str::<ChatCompletionsResponse>(&body);
        match parsed {
            Ok(r) => {
                if let Some(err) = r.error {
                    return Ok(RemoteReply::Rejected {
                        status: status.as_u16(),
                        code: err.code,
                    });
                }
                if !status.is_success() {
                    return Ok(RemoteReply::Rejected {
                        status: status.as_u16(),
                        code: None,
                    });
                }
                Ok(RemoteReply::Completed(
                    r.choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.message)
                        .and_then(|m| m.content)
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty()),
                ))
            }
            Err(_) if !status.is_success() => Ok(RemoteReply::Rejected {
                status: status.as_u16(),
                code: None,
            }),
            Err(e) => Err(Error::Malformed(format!(
                "openai_compat chat.completions: {e}"
            ))),
        }
    }
}

#[async_trait::async_trait]
impl SummaryBackend for OpenAiCompatClient {
    fn name(&self) -> &'static str {
        "openai_compat"
    }

    async fn summarize(&self, req: &SummaryRequest) -> Result<RemoteReply> {
        self.chat(
            &req.instruction,
            &req.text,
            Some(SUMMARY_MAX_TOKENS),
            Some(SUMMARY_TEMPERATURE),
        )
        .await
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> OpenAiCompatClient {
        OpenAiCompatClient::new(
            reqwest::Client::new(),
            base,
            Some("test-key".to_string()),
            "gpt-4o-mini",
        )
    }

    #[tokio::test]
    async fn sends_chat_shape_and_reads_first_choice() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(
                |headers: axum::http::HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    let auth = headers
                        .get(axum::http::header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("");
                    let ok = auth == "Bearer test-key"
                        && body["model"] == "gpt-4o-mini"
                        && body["messages"][0]["role"] == "system"
                        && body["messages"][1]["role"] == "user"
                        && body["messages"][1]["content"] == "hello text"
                        && body["temperature"] == 0.3
                        && body["max_tokens"] == 200;
                    let content = if ok { "  Short summary.  " } else { "bad request shape" };
                    Json(serde_json::json!({
                        "choices": [{"message": {"content": content}}]
                    }))
                },
            ),
        );
        let base = serve(app).await;
        let req = SummaryRequest {
            instruction: "summarize".to_string(),
            text: "hello text".to_string(),
        };
        let got = client(&format!("{base}/")).summarize(&req).await.unwrap();
        assert_eq!(got, RemoteReply::Completed(Some("Short summary.".to_string())));
    }

    #[tokio::test]
    async fn error_payload_is_a_rejection_with_code() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({"error": {"code": "rate_limit_exceeded"}})),
                )
            }),
        );
        let base = serve(app).await;
        let got = client(&base).chat("s", "u", None, None).await.unwrap();
        assert_eq!(
            got,
            RemoteReply::Rejected {
                status: 429,
                code: Some("rate_limit_exceeded".to_string())
            }
        );
    }

    #[tokio::test]
    async fn empty_choices_complete_without_summary() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({"choices": []})) }),
        );
        let base = serve(app).await;
        let got = client(&base).chat("s", "u", None, None).await.unwrap();
        assert_eq!(got, RemoteReply::Completed(None));
    }

    #[tokio::test]
    async fn non_json_success_is_malformed() {
        let app = Router::new().route("/v1/chat/completions", post(|| async { "<html>oops</html>" }));
        let base = serve(app).await;
        let err = client(&base).chat("s", "u", None, None).await.unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(&format!("http://{addr}"))
            .chat("s", "u", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn from_config_requires_key_and_valid_url() {
        let mut cfg = GatewayConfig::default();
        assert!(matches!(
            OpenAiCompatClient::from_config(&cfg),
            Err(Error::NotConfigured(_))
        ));
        cfg.api_key = Some("k".to_string());
        cfg.base_url = "::nope".to_string();
        assert!(OpenAiCompatClient::from_config(&cfg).is_err());
        cfg.base_url = "http://127.0.0.1:9".to_string();
        let c = OpenAiCompatClient::from_config(&cfg).unwrap();
        assert_eq!(c.model(), "gpt-4o-mini");
        assert!(!format!("{c:?}").contains("\"k\""));
    }
}
