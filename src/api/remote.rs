//! Purpose: Blocking HTTP implementation of `NetworkGateway` for a `/posts` REST resource.
//! Exports: `HttpGateway`, `DEFAULT_BASE_URL`.
//! Role: Only component that talks to the network; maps transport results onto crate errors.
//! Invariants: Non-2xx responses become `ErrorKind::Remote` carrying the status code.
//! Invariants: Transport failures become `ErrorKind::Io`; bodies are decoded as `Post`.
#![allow(clippy::result_large_err)]

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::core::gateway::NetworkGateway;
use crate::core::post::Post;

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    id: u64,
    title: &'a str,
    body: &'a str,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(HttpGatewayInner { base_url, agent }),
        })
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            inner: Arc::new(HttpGatewayInner {
                base_url: self.inner.base_url.clone(),
                agent,
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn posts_url(&self, id: Option<u64>) -> ApiResult<Url> {
        match id {
            Some(id) => build_url(&self.inner.base_url, &["posts", &id.to_string()]),
            None => build_url(&self.inner.base_url, &["posts"]),
        }
    }

    fn send<T>(&self, method: &str, url: &Url, body: Option<&T>) -> ApiResult<ureq::Response>
    where
        T: Serialize,
    {
        debug!(method, url = url.as_str(), "gateway request");
        let request = self
            .inner
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        let response = match body {
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json; charset=UTF-8")
                    .send_string(&payload)
            }
            None => request.call(),
        };

        match response {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(code, _resp)) => {
                debug!(method, status = code, "gateway request rejected");
                Err(Error::remote(code))
            }
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_source(err)),
        }
    }

    fn request_json<T, R>(&self, method: &str, url: &Url, body: Option<&T>) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send(method, url, body)?;
        read_json_response(response)
    }
}

impl NetworkGateway for HttpGateway {
    fn create(&self, title: &str, body: &str) -> ApiResult<Post> {
        let url = self.posts_url(None)?;
        self.request_json("POST", &url, Some(&CreateRequest { title, body }))
    }

    fn read(&self, id: u64) -> ApiResult<Post> {
        let url = self.posts_url(Some(id))?;
        self.request_json::<(), _>("GET", &url, None)
            .map_err(|err| err.with_id(id))
    }

    fn update(&self, id: u64, title: &str, body: &str) -> ApiResult<Post> {
        let url = self.posts_url(Some(id))?;
        self.request_json("PUT", &url, Some(&UpdateRequest { id, title, body }))
            .map_err(|err| err.with_id(id))
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        let url = self.posts_url(Some(id))?;
        self.send::<()>("DELETE", &url, None)
            .map(|_| ())
            .map_err(|err| err.with_id(id))
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid service base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("service base url must use http or https scheme"));
    }
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage).with_message("service base url cannot be a base"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Appends `segments` to the base url's own path (a trailing slash is dropped first).
fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("service base url cannot be a base")
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let status = response.status();
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Remote)
            .with_message(format!("invalid response json (status {status})"))
            .with_source(err)
    })
}
