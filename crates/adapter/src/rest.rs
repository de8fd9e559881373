use std::time::Duration;

use async_trait::async_trait;
use domain::{Attachment, CaptchaChallenge, CommentPage, PageQuery, Submission};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{ApiError, CommentApi};

const LIST_PATH: &str = "api/v1/comments/";
const CREATE_PATH: &str = "api/v1/comments/create/";
const CAPTCHA_PATH: &str = "get_captcha/";

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: base_url_with_slash(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }
}

/// Endpoint paths are joined relative to the base, so a mount prefix must end in `/`.
fn base_url_with_slash(raw: &str) -> Result<Url, url::ParseError> {
    let raw = raw.trim();
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{}/", raw))
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(rejection(status.as_u16(), resp).await);
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn rejection(status: u16, resp: reqwest::Response) -> ApiError {
    let message = match resp.text().await {
        Ok(body) => message_from_body(&body),
        Err(e) => {
            debug!("Could not read error body: {}", e);
            None
        }
    };
    ApiError::Rejected { status, message }
}

fn message_from_body(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn file_part(a: Attachment) -> Result<Part, ApiError> {
    Ok(Part::bytes(a.bytes)
        .file_name(a.file_name)
        .mime_str(a.mime)?)
}

#[async_trait]
impl CommentApi for RestClient {
    async fn list_comments(&self, query: &PageQuery) -> Result<CommentPage, ApiError> {
        let url = self.endpoint(LIST_PATH)?;
        let resp = self
            .http
            .get(url)
            .query(&query.query_pairs())
            .send()
            .await?;
        decode(resp).await
    }

    async fn create_comment(&self, submission: Submission) -> Result<(), ApiError> {
        let url = self.endpoint(CREATE_PATH)?;

        let mut form = Form::new();
        for (name, value) in submission.text_fields() {
            form = form.text(name, value);
        }
        if let Some(image) = submission.image {
            form = form.part("image", file_part(image)?);
        }
        if let Some(text_file) = submission.text_file {
            form = form.part("text_file", file_part(text_file)?);
        }

        let resp = self.http.post(url).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(rejection(status.as_u16(), resp).await);
        }

        // A 2xx can still carry {"success": false, "message": ...}.
        let body = resp.text().await?;
        if let Ok(ack) = serde_json::from_str::<Value>(&body) {
            if ack.get("success").and_then(Value::as_bool) == Some(false) {
                warn!("Server acknowledged submission with success=false");
                return Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: message_from_body(&body),
                });
            }
        }
        Ok(())
    }

    async fn fetch_captcha(&self) -> Result<CaptchaChallenge, ApiError> {
        let url = self.endpoint(CAPTCHA_PATH)?;
        let resp = self.http.get(url).send().await?;
        let mut challenge: CaptchaChallenge = decode(resp).await?;
        if challenge.value.starts_with('/') {
            challenge.value = self.base.join(&challenge.value)?.to_string();
        }
        Ok(challenge)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Multipart, Query},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use domain::{Order, Sort, SortBy};
    use serde_json::json;

    use super::*;
    use crate::testing::spawn_server;

    fn client(base: &str) -> RestClient {
        RestClient::new(base, Duration::from_secs(5)).unwrap()
    }

    fn submission() -> Submission {
        Submission {
            user_name: "ann".into(),
            email: "ann@example.org".into(),
            home_page: "".into(),
            text: "<i>hi</i>".into(),
            captcha_key: "k1".into(),
            captcha_value: "ABCD".into(),
            parent_comment: None,
            image: None,
            text_file: None,
        }
    }

    #[tokio::test]
    async fn list_sends_page_and_sort_together() {
        let seen = Arc::new(Mutex::new(HashMap::new()));
        let seen_in_handler = seen.clone();
        let app = Router::new().route(
            "/api/v1/comments/",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let seen = seen_in_handler.clone();
                async move {
                    *seen.lock().unwrap() = q;
                    Json(json!({
                        "comments": [{ "id": 1, "user_name": "ann", "children": [] }],
                        "page": "2",
                        "total_pages": 4
                    }))
                }
            }),
        );
        let base = spawn_server(app).await;

        let query = PageQuery {
            page: 2,
            sort: Some(Sort {
                by: SortBy::Name,
                order: Order::Desc,
            }),
        };
        let page = client(&base).list_comments(&query).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.comments.len(), 1);

        let q = seen.lock().unwrap().clone();
        assert_eq!(q.get("page").map(String::as_str), Some("2"));
        assert_eq!(q.get("sort_by").map(String::as_str), Some("user_name"));
        assert_eq!(q.get("order").map(String::as_str), Some("desc"));
    }

    #[tokio::test]
    async fn list_failure_is_reported() {
        let app = Router::new().route(
            "/api/v1/comments/",
            get(|| async { (StatusCode::NOT_FOUND, "Invalid page.") }),
        );
        let base = spawn_server(app).await;
        let err = client(&base)
            .list_comments(&PageQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn create_posts_multipart_fields_and_files() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_handler = seen.clone();
        let app = Router::new().route(
            "/api/v1/comments/create/",
            post(move |mut multipart: Multipart| {
                let seen = seen_in_handler.clone();
                async move {
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_string();
                        let file_name = field.file_name().map(str::to_string);
                        let data = field.bytes().await.unwrap();
                        seen.lock()
                            .unwrap()
                            .push((name, file_name, String::from_utf8_lossy(&data).to_string()));
                    }
                    Json(json!({ "success": true, "comment_id": 9 }))
                }
            }),
        );
        let base = spawn_server(app).await;

        let mut s = submission();
        s.parent_comment = Some("3".into());
        s.text_file = Some(Attachment::text_file("notes.txt", b"plain".to_vec()).unwrap());
        client(&base).create_comment(s).await.unwrap();

        let fields = seen.lock().unwrap().clone();
        let field = |n: &str| fields.iter().find(|(name, _, _)| name == n).cloned();
        assert_eq!(field("captcha_key").unwrap().2, "k1");
        assert_eq!(field("captcha_value").unwrap().2, "ABCD");
        assert_eq!(field("parent_comment").unwrap().2, "3");
        assert_eq!(field("text").unwrap().2, "<i>hi</i>");
        let file = field("text_file").unwrap();
        assert_eq!(file.1.as_deref(), Some("notes.txt"));
        assert_eq!(file.2, "plain");
        assert!(field("image").is_none());
    }

    #[tokio::test]
    async fn create_rejection_carries_server_message() {
        let app = Router::new().route(
            "/api/v1/comments/create/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "message": "Wrong CAPTCHA" })),
                )
                    .into_response()
            }),
        );
        let base = spawn_server(app).await;
        let err = client(&base).create_comment(submission()).await.unwrap_err();
        assert_eq!(err.server_message(), Some("Wrong CAPTCHA"));
    }

    #[tokio::test]
    async fn create_success_false_is_a_rejection() {
        let app = Router::new().route(
            "/api/v1/comments/create/",
            post(|| async { Json(json!({ "success": false, "message": "Invalid form data" })) }),
        );
        let base = spawn_server(app).await;
        let err = client(&base).create_comment(submission()).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 200, .. }));
        assert_eq!(err.server_message(), Some("Invalid form data"));
    }

    #[tokio::test]
    async fn captcha_prompt_is_made_absolute() {
        let app = Router::new().route(
            "/get_captcha/",
            get(|| async { Json(json!({ "key": "abc", "image_url": "/captcha/image/abc/" })) }),
        );
        let base = spawn_server(app).await;
        let challenge = client(&base).fetch_captcha().await.unwrap();
        assert_eq!(challenge.key, "abc");
        assert_eq!(challenge.value, format!("{}/captcha/image/abc/", base));
    }

    #[test]
    fn base_url_keeps_mount_prefix() {
        let c = client("http://example.org/widget");
        assert_eq!(
            c.endpoint(LIST_PATH).unwrap().as_str(),
            "http://example.org/widget/api/v1/comments/"
        );
    }
}
