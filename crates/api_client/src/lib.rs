use std::time::Duration;

use async_trait::async_trait;
use core_types::{
    ApiResult, ChatRequest, ChatResponse, HealthStatus, ImageAttachment, ImportResult,
    KnowledgeAck, KnowledgeCount, KnowledgeDetail, KnowledgeItem, KnowledgeSearchResult,
    KnowledgeUpdate, RagBackend, RequestError, SimpleChatReply, UploadFile,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Upper bound on waiting for any backend response.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub struct HttpRagClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpRagClient {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| RequestError::InvalidRequest(format!("bad base url `{base_url}`: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RequestError::InvalidRequest(format!(
                "base url `{base_url}` cannot carry a path"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RequestError::transport)?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> (RequestBuilder, String) {
        let url = self.endpoint(segments);
        let path = url.path().to_string();
        (self.client.request(method, url), path)
    }

    async fn execute(&self, request: RequestBuilder, method: &str, path: &str) -> ApiResult<Value> {
        debug!(method, path, "api request");
        let response = request
            .send()
            .await
            .map_err(|err| self.map_transport(err))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.map_transport(err))?;

        if !status.is_success() {
            let detail = extract_detail(&text);
            warn!(
                method,
                path,
                status = status.as_u16(),
                detail = detail.as_deref().unwrap_or_default(),
                "api request failed"
            );
            return Err(RequestError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        debug!(method, path, status = status.as_u16(), "api response");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| RequestError::Decode(err.to_string()))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> ApiResult<T> {
        let value = self.execute(request, method, path).await?;
        serde_json::from_value(value).map_err(|err| RequestError::Decode(err.to_string()))
    }

    fn map_transport(&self, err: reqwest::Error) -> RequestError {
        if err.is_timeout() {
            RequestError::Timeout {
                after: self.timeout,
            }
        } else {
            RequestError::transport(err)
        }
    }
}

#[async_trait]
impl RagBackend for HttpRagClient {
    async fn send_chat_turn(&self, request: ChatRequest) -> ApiResult<ChatResponse> {
        let (builder, path) = self.request(Method::POST, &["api", "v1", "chat", ""]);
        self.fetch(builder.json(&request), "POST", &path).await
    }

    async fn send_chat_turn_with_image(
        &self,
        question: &str,
        image: &ImageAttachment,
        use_knowledge: bool,
    ) -> ApiResult<ChatResponse> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|err| RequestError::InvalidRequest(format!("bad image mime type: {err}")))?;
        let form = Form::new()
            .text("question", question.to_string())
            .part("image", part)
            .text("use_knowledge_base", use_knowledge.to_string());
        let (builder, path) = self.request(Method::POST, &["api", "v1", "chat", "with-image"]);
        self.fetch(builder.multipart(form), "POST", &path).await
    }

    async fn chat_simple(
        &self,
        question: &str,
        use_knowledge: bool,
    ) -> ApiResult<SimpleChatReply> {
        let (builder, path) = self.request(Method::GET, &["api", "v1", "chat", "simple"]);
        let builder = builder.query(&[
            ("question", question.to_string()),
            ("use_knowledge", use_knowledge.to_string()),
        ]);
        self.fetch(builder, "GET", &path).await
    }

    async fn list_knowledge(
        &self,
        limit: u32,
        offset: u32,
    ) -> ApiResult<Vec<KnowledgeSearchResult>> {
        let (builder, path) = self.request(Method::GET, &["api", "v1", "knowledge", "list"]);
        let builder = builder.query(&[("limit", limit), ("offset", offset)]);
        let value = self.execute(builder, "GET", &path).await?;
        Ok(coerce_entries(value, &path))
    }

    async fn search_knowledge(
        &self,
        query: &str,
        top_k: u32,
    ) -> ApiResult<Vec<KnowledgeSearchResult>> {
        let (builder, path) = self.request(Method::GET, &["api", "v1", "knowledge", "search"]);
        let builder = builder.query(&[("query", query.to_string()), ("top_k", top_k.to_string())]);
        let value = self.execute(builder, "GET", &path).await?;
        Ok(coerce_entries(value, &path))
    }

    async fn knowledge_count(&self) -> ApiResult<KnowledgeCount> {
        let (builder, path) = self.request(Method::GET, &["api", "v1", "knowledge", "count"]);
        self.fetch(builder, "GET", &path).await
    }

    async fn knowledge_detail(&self, doc_id: &str) -> ApiResult<KnowledgeDetail> {
        let (builder, path) = self.request(Method::GET, &["api", "v1", "knowledge", doc_id]);
        self.fetch(builder, "GET", &path).await
    }

    async fn create_knowledge(&self, item: &KnowledgeItem) -> ApiResult<KnowledgeAck> {
        let (builder, path) = self.request(Method::POST, &["api", "v1", "knowledge", "add"]);
        self.fetch(builder.json(item), "POST", &path).await
    }

    async fn create_knowledge_batch(&self, items: &[KnowledgeItem]) -> ApiResult<KnowledgeAck> {
        let (builder, path) =
            self.request(Method::POST, &["api", "v1", "knowledge", "add-batch"]);
        self.fetch(builder.json(items), "POST", &path).await
    }

    async fn update_knowledge(
        &self,
        doc_id: &str,
        patch: &KnowledgeUpdate,
    ) -> ApiResult<KnowledgeAck> {
        let (builder, path) = self.request(Method::PUT, &["api", "v1", "knowledge", doc_id]);
        self.fetch(builder.json(patch), "PUT", &path).await
    }

    async fn delete_knowledge(&self, doc_id: &str) -> ApiResult<KnowledgeAck> {
        let (builder, path) =
            self.request(Method::DELETE, &["api", "v1", "knowledge", "delete", doc_id]);
        self.fetch(builder, "DELETE", &path).await
    }

    async fn import_knowledge_file(
        &self,
        file: &UploadFile,
        format: Option<&str>,
        default_category: &str,
    ) -> ApiResult<ImportResult> {
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let mut form = Form::new().part("file", part);
        if let Some(format) = format.filter(|f| !f.trim().is_empty()) {
            form = form.text("format", format.to_string());
        }
        form = form.text("default_category", default_category.to_string());
        let (builder, path) = self.request(Method::POST, &["api", "v1", "knowledge", "import"]);
        self.fetch(builder.multipart(form), "POST", &path).await
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        let (builder, path) = self.request(Method::GET, &["health"]);
        self.fetch(builder, "GET", &path).await
    }
}

/// Pulls the human readable message out of an error body shaped like `{"detail": ...}`.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

/// Anything but a JSON array becomes an empty list; undecodable rows are skipped.
fn coerce_entries(value: Value, path: &str) -> Vec<KnowledgeSearchResult> {
    let Value::Array(items) = value else {
        warn!(path, "expected an array of knowledge entries; treating as empty");
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(path, error = %err, "skipping undecodable knowledge entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.expect("read request");
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                let body_len = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[tokio::test]
    async fn posts_text_turn_as_json() {
        let body = json!({
            "answer": "早睡早起",
            "confidence": "中",
            "knowledge_sources": ["作息"],
            "llm_model": "qwen-max",
            "has_image": false
        })
        .to_string();
        let (base, server) = serve_once("200 OK", body).await;
        let client = HttpRagClient::new(&base).expect("client");

        let response = client
            .send_chat_turn(ChatRequest::text("怎么抗衰老", Vec::new()))
            .await
            .expect("chat");
        let request = server.await.expect("server");

        assert!(request.starts_with("POST /api/v1/chat/ HTTP/1.1"));
        assert!(request.contains("\"use_knowledge_base\":true"));
        assert_eq!(response.answer, "早睡早起");
        assert_eq!(response.knowledge_sources, vec!["作息".to_string()]);
    }

    #[tokio::test]
    async fn image_turn_is_multipart() {
        let body = json!({ "answer": "a", "confidence": "低", "has_image": true }).to_string();
        let (base, server) = serve_once("200 OK", body).await;
        let client = HttpRagClient::new(&base).expect("client");
        let image = ImageAttachment::new("scan.png", vec![0x89, 0x50]);

        let response = client
            .send_chat_turn_with_image("描述这张图片", &image, true)
            .await
            .expect("chat");
        let request = server.await.expect("server");

        assert!(request.starts_with("POST /api/v1/chat/with-image HTTP/1.1"));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains("name=\"question\""));
        assert!(request.contains("filename=\"scan.png\""));
        assert!(request.contains("name=\"use_knowledge_base\""));
        assert!(response.has_image);
    }

    #[tokio::test]
    async fn list_coerces_non_array_to_empty() {
        let (base, server) = serve_once("200 OK", json!({ "items": [] }).to_string()).await;
        let client = HttpRagClient::new(&base).expect("client");

        let entries = client.list_knowledge(100, 0).await.expect("list");
        let request = server.await.expect("server");

        assert!(entries.is_empty());
        assert!(request.starts_with("GET /api/v1/knowledge/list?limit=100&offset=0 HTTP/1.1"));
    }

    #[tokio::test]
    async fn surfaces_server_detail() {
        let (base, server) =
            serve_once("404 Not Found", json!({ "detail": "文档不存在" }).to_string()).await;
        let client = HttpRagClient::new(&base).expect("client");

        let err = client.delete_knowledge("doc1").await.expect_err("should fail");
        let request = server.await.expect("server");

        assert!(request.starts_with("DELETE /api/v1/knowledge/delete/doc1 HTTP/1.1"));
        assert_eq!(err.detail(), Some("文档不存在"));
        assert!(matches!(err, RequestError::Server { status: 404, .. }));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });
        let client = HttpRagClient::with_timeout(&format!("http://{addr}"), Duration::from_millis(200))
            .expect("client");

        let err = client.knowledge_count().await.expect_err("should time out");

        assert!(err.is_timeout());
        server.abort();
    }

    #[test]
    fn builds_endpoints_under_base_path() {
        let client = HttpRagClient::new("http://localhost:8000/rag/").expect("client");
        assert_eq!(
            client.endpoint(&["api", "v1", "chat", ""]).as_str(),
            "http://localhost:8000/rag/api/v1/chat/"
        );
        assert_eq!(
            client
                .endpoint(&["api", "v1", "knowledge", "a b/c"])
                .as_str(),
            "http://localhost:8000/rag/api/v1/knowledge/a%20b%2Fc"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(HttpRagClient::new("not a url").is_err());
        assert!(HttpRagClient::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn extracts_detail_variants() {
        assert_eq!(
            extract_detail(r#"{"detail":"检索失败"}"#).as_deref(),
            Some("检索失败")
        );
        assert_eq!(
            extract_detail(r#"{"detail":[{"loc":["body","question"],"msg":"field required"}]}"#)
                .as_deref(),
            Some("field required")
        );
        assert_eq!(extract_detail("<html>bad gateway</html>"), None);
        assert_eq!(extract_detail(r#"{"error":"x"}"#), None);
    }

    #[test]
    fn skips_undecodable_rows() {
        let entries = coerce_entries(
            json!([
                { "content": "a", "category": "c", "score": 0.3, "metadata": {} },
                { "category": "missing content" }
            ]),
            "/api/v1/knowledge/list",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "a");
    }
}
