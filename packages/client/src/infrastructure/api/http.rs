//! `reqwest` implementation of [`RoomApi`].

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, multipart};
use serde_json::{Value, json};

use super::{
    ApiError, AuthSession, Category, LeaderEntry, ProposerEntry, PublicRoom, RoomApi, Suggestion,
    SuggestionKind, normalize,
};
use crate::{
    domain::{Identity, RoomConfig, RoomSnapshot, Visibility},
    infrastructure::dto::{conversion::settings_body, payload},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpApi {
    client: Client,
    api_base: String,
    token: Mutex<Option<String>>,
}

impl HttpApi {
    pub fn new(api_base: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Bearer token obtained by the last login or registration.
    pub fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|token| token.clone())
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = token;
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn endpoint(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, &format!("{}{}", self.api_base, path))
    }

    /// Send and decode a JSON body; a non-2xx status becomes [`ApiError::Status`].
    async fn send(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        if !status.is_success() {
            let message = normalize::error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
            tracing::warn!("HTTP {}: {}", status.as_u16(), message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn authenticate(&self, path: &str, body: Value) -> Result<AuthSession, ApiError> {
        let body = self.send(self.endpoint(Method::POST, path).json(&body)).await?;
        let token = normalize::token(&body);
        if token.is_some() {
            self.set_token(token.clone());
        }
        let user = match normalize::identity(normalize::user(&body)) {
            Some(user) => user,
            None => self.me().await?,
        };
        tracing::info!("Authenticated as '{}'", user.username);
        Ok(AuthSession { token, user })
    }
}

#[async_trait]
impl RoomApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        self.authenticate(
            "/auth/login",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        self.authenticate(
            "/auth/register",
            json!({ "username": username, "email": email, "password": password }),
        )
        .await
    }

    async fn me(&self) -> Result<Identity, ApiError> {
        let body = self.send(self.endpoint(Method::GET, "/auth/me")).await?;
        normalize::identity(normalize::user(&body)).ok_or(ApiError::MissingField("user"))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let result = self.send(self.endpoint(Method::POST, "/auth/logout")).await;
        self.set_token(None);
        result.map(|_| ())
    }

    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let body = self.send(self.endpoint(Method::GET, "/categories")).await?;
        Ok(normalize::categories(&body))
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderEntry>, ApiError> {
        let body = self.send(self.endpoint(Method::GET, "/leaderboard")).await?;
        Ok(normalize::leaders(&body))
    }

    async fn proposers(&self) -> Result<Vec<ProposerEntry>, ApiError> {
        let body = self
            .send(self.endpoint(Method::GET, "/leaderboard/proposers"))
            .await?;
        Ok(normalize::proposers(&body))
    }

    async fn create_room(
        &self,
        name: Option<String>,
        visibility: Visibility,
    ) -> Result<String, ApiError> {
        let mut body = json!({
            "visibility": match visibility {
                Visibility::Public => "public",
                Visibility::Private => "private",
            },
        });
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            body["name"] = Value::String(name.trim().to_string());
        }
        let body = self
            .send(self.endpoint(Method::POST, "/rooms").json(&body))
            .await?;
        normalize::created_room_code(&body).ok_or(ApiError::MissingField("code"))
    }

    async fn public_rooms(&self) -> Result<Vec<PublicRoom>, ApiError> {
        let body = self.send(self.endpoint(Method::GET, "/rooms/public")).await?;
        Ok(normalize::public_rooms(&body))
    }

    async fn join_room(&self, code: &str) -> Result<(), ApiError> {
        let path = format!("/rooms/{}/join", code);
        self.send(self.endpoint(Method::POST, &path).json(&json!({})))
            .await
            .map(|_| ())
    }

    async fn get_room(&self, code: &str) -> Result<RoomSnapshot, ApiError> {
        let path = format!("/rooms/{}", code);
        let body = self.send(self.endpoint(Method::GET, &path)).await?;
        payload::room_snapshot(&body).map_err(|_| ApiError::MissingField("room"))
    }

    async fn put_settings(&self, code: &str, config: RoomConfig) -> Result<(), ApiError> {
        let path = format!("/rooms/{}/settings", code);
        self.send(
            self.endpoint(Method::PUT, &path)
                .json(&settings_body(&config)),
        )
        .await
        .map(|_| ())
    }

    async fn suggest(&self, suggestion: Suggestion) -> Result<(), ApiError> {
        let alternatives = if suggestion.alternatives.is_empty() {
            String::new()
        } else {
            Value::from(suggestion.alternatives).to_string()
        };
        let mut form = multipart::Form::new()
            .text("text", suggestion.text)
            .text(
                "type",
                match suggestion.kind {
                    SuggestionKind::Citation => "CITATION",
                    SuggestionKind::Image => "IMAGE",
                },
            )
            .text("answer", suggestion.answer)
            .text("alternatives", alternatives)
            .text("explanation", suggestion.explanation)
            .text(
                "categoryIds",
                Value::from(suggestion.category_ids).to_string(),
            );
        if let Some(citation) = suggestion.citation_text {
            form = form.text("citationText", citation);
        }
        if let Some(image) = suggestion.image {
            form = form.part("image", multipart::Part::bytes(image).file_name("image"));
        }
        self.send(self.endpoint(Method::POST, "/suggest").multipart(form))
            .await
            .map(|_| ())
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: format!("Cannot fetch {}", url),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
