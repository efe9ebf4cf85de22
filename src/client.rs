//! Thin HTTP layer shared by the login protocol and the REST accessor.
//!
//! Every request carries the headers spec §6 mandates (`Content-Type`,
//! `Accept`, `v`, `cv`, `cp`, `User-Agent`, and `accessToken` when
//! authenticated). `GET` requests that need a body (the salt endpoint)
//! encode it as a `_body=<json>` query parameter, since `GET` bodies are
//! not universally forwarded by intermediaries.

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::constants::{APP_USER_AGENT, CLIENT_PLATFORM, VERSION_STRING};
use crate::error::CoreError;

#[derive(Debug)]
pub(crate) struct Client {
    inner: reqwest::Client,
    base_url: String,
}

impl Client {
    pub(crate) fn try_new(base_url: String) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("set up HTTP client")?;
        Ok(Self { inner, base_url })
    }

    /// `GET` with the body encoded as a `_body` query parameter.
    pub(crate) async fn get_with_body<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        version: &str,
        access_token: Option<&str>,
    ) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let encoded = serde_json::to_string(body).context("encode query body")?;
        let req = self
            .request(Method::GET, path, version, access_token)
            .query(&[("_body", encoded)]);
        self.send(req).await
    }

    pub(crate) async fn get<Resp>(
        &self,
        path: &str,
        version: &str,
        access_token: Option<&str>,
    ) -> Result<Resp>
    where
        Resp: DeserializeOwned,
    {
        let req = self.request(Method::GET, path, version, access_token);
        self.send(req).await
    }

    /// `GET` with plain query parameters (used by `load_range`).
    pub(crate) async fn get_with_query<Resp>(
        &self,
        path: &str,
        query: &[(&str, String)],
        version: &str,
        access_token: Option<&str>,
    ) -> Result<Resp>
    where
        Resp: DeserializeOwned,
    {
        let req = self
            .request(Method::GET, path, version, access_token)
            .query(query);
        self.send(req).await
    }

    pub(crate) async fn post<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        version: &str,
        access_token: Option<&str>,
    ) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let req = self
            .request(Method::POST, path, version, access_token)
            .json(body);
        self.send(req).await
    }

    pub(crate) async fn delete(
        &self,
        path: &str,
        version: &str,
        access_token: Option<&str>,
    ) -> Result<()> {
        let req = self.request(Method::DELETE, path, version, access_token);
        let resp = req.send().await.map_err(|e| self.classify(&e))?;
        self.check_status(resp).await?;
        Ok(())
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        version: &str,
        access_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        debug!(%method, path, "service request");

        let mut req = self
            .inner
            .request(method, format!("{}/rest/{path}", self.base_url))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("v", version)
            .header("cv", VERSION_STRING)
            .header("cp", CLIENT_PLATFORM);

        if let Some(access_token) = access_token {
            req = req.header("accessToken", access_token);
        }

        req
    }

    async fn send<Resp>(&self, req: reqwest::RequestBuilder) -> Result<Resp>
    where
        Resp: DeserializeOwned,
    {
        let resp = req.send().await.map_err(|e| self.classify(&e))?;
        let resp = self.check_status(resp).await?;
        let text = resp.text().await.context("read response body")?;
        let mut de = serde_json::Deserializer::from_str(&text);
        serde_path_to_error::deserialize(&mut de).context("decode JSON response")
    }

    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(CoreError::AuthFailed.into());
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("request failed with status {status}: {body}");
        }
        Ok(resp)
    }

    fn classify(&self, e: &reqwest::Error) -> anyhow::Error {
        match CoreError::from_reqwest(e) {
            Some(core_err) => core_err.into(),
            None => anyhow::anyhow!("{e}").context("HTTP request"),
        }
    }
}
