//! Integration tests for FurniLux.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p furnilux-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_properties` - cart store behaviour against in-memory storage
//! - `storefront_cart` - cart endpoints driven through the router
//!
//! Router tests run in-process: [`TestStorefront`] sends requests with
//! `tower::ServiceExt::oneshot`, carries the session cookie between them and
//! drives notification timing through a [`ManualClock`].

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use furnilux_core::ManualClock;
use furnilux_storefront::{app, config::StorefrontConfig, state::AppState};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Value of a response header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// In-process storefront with one browser session.
pub struct TestStorefront {
    router: Router,
    clock: ManualClock,
    cookie: Option<String>,
}

impl TestStorefront {
    /// Storefront with the default storage quota.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vars(&[])
    }

    /// Storefront whose session storage holds at most `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self::from_vars(&[("STOREFRONT_STORAGE_QUOTA_BYTES", quota.to_string())])
    }

    fn from_vars(extra: &[(&str, String)]) -> Self {
        let config = StorefrontConfig::from_lookup(|key| match key {
            "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
            _ => extra
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone()),
        })
        .expect("test configuration is valid");

        let clock = ManualClock::default();
        let state = AppState::with_clock(config, Arc::new(clock.clone()));

        Self {
            router: app(state),
            clock,
            cookie: None,
        }
    }

    /// The clock driving notification timing.
    #[must_use]
    pub const fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Forget the session cookie, as a new browser session would.
    pub fn end_session(&mut self) {
        self.cookie = None;
    }

    /// Send a GET request.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = Request::get(path);
        self.send(request, Body::empty()).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&mut self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut request = Request::get(path);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request, Body::empty()).await
    }

    /// Send a form-encoded POST request. `body` must already be encoded.
    pub async fn post_form(&mut self, path: &str, body: &str) -> TestResponse {
        let request =
            Request::post(path).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(body.to_string())).await
    }

    /// Add a product through the storefront's add-to-cart endpoint.
    pub async fn add(&mut self, id: &str, name: &str, price: &str) -> TestResponse {
        let body = format!("id={id}&name={}&price={price}&image=", name.replace(' ', "+"));
        self.post_form("/cart/add", &body).await
    }

    /// Send form-encoded POST requests to `path` at the same time, all in
    /// the current session. Responses come back in the order of `bodies`.
    pub async fn post_forms_concurrently(
        &self,
        path: &str,
        bodies: impl IntoIterator<Item = String>,
    ) -> Vec<TestResponse> {
        let requests = bodies.into_iter().map(|body| {
            let request =
                Request::post(path).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            (request, Body::from(body))
        });
        self.send_concurrently(requests).await
    }

    /// Send `times` GET requests to `path` at the same time.
    pub async fn get_concurrently(&self, path: &str, times: usize) -> Vec<TestResponse> {
        let requests = (0..times).map(|_| (Request::get(path), Body::empty()));
        self.send_concurrently(requests).await
    }

    async fn send_concurrently(
        &self,
        requests: impl IntoIterator<Item = (axum::http::request::Builder, Body)>,
    ) -> Vec<TestResponse> {
        let tasks: Vec<_> = requests
            .into_iter()
            .map(|(request, body)| {
                let router = self.router.clone();
                let cookie = self.cookie.clone();
                tokio::spawn(async move { dispatch(router, cookie.as_deref(), request, body).await.0 })
            })
            .collect();

        let mut responses = Vec::with_capacity(tasks.len());
        for task in tasks {
            responses.push(task.await.expect("request task completed"));
        }
        responses
    }

    async fn send(&mut self, request: axum::http::request::Builder, body: Body) -> TestResponse {
        let (response, set_cookie) =
            dispatch(self.router.clone(), self.cookie.as_deref(), request, body).await;
        if set_cookie.is_some() {
            self.cookie = set_cookie;
        }
        response
    }
}

/// Send one request, returning the response and any session cookie it set.
async fn dispatch(
    router: Router,
    cookie: Option<&str>,
    mut request: axum::http::request::Builder,
    body: Body,
) -> (TestResponse, Option<String>) {
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = request.body(body).expect("request is well formed");

    let response = router.oneshot(request).await.expect("router is infallible");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body is readable")
        .to_bytes();

    let response = TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    };
    (response, set_cookie)
}

impl Default for TestStorefront {
    fn default() -> Self {
        Self::new()
    }
}
