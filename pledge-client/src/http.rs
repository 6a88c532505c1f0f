use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::{
    api::{
        self, ApiResponse, CampaignId, Comment, CommentData, CommentId, CommentPage,
        CommentUpdate, NewComment, PageRequest, ReplyPage,
    },
    ClientConfig, CommentService, Error,
};

/// `CommentService` talking to the REST backend
pub struct HttpService {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpService {
    pub fn new(config: ClientConfig) -> HttpService {
        HttpService {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> HttpService {
        HttpService { client, config }
    }

    /// Builds `<host>/api/<segments...>`, percent-encoding each segment so
    /// that ids are never read as path separators or query strings
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = Url::parse(self.config.base_url())
            .with_context(|| format!("parsing backend host {:?}", self.config.host))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("backend host {:?} cannot hold a path", self.config.host))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(tok) => req.bearer_auth(&tok.0),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<ApiResponse<serde_json::Value>, Error> {
        let resp = req.send().await.context("sending request to server")?;
        let status = resp.status();
        let body = resp.bytes().await.context("reading server response")?;
        if !status.is_success() {
            let err = api::Error::from_response(status, &body);
            tracing::debug!(?status, %err, "server refused request");
            return Err(Error::Api(err));
        }
        let resp: ApiResponse<serde_json::Value> =
            serde_json::from_slice(&body).context("parsing server response envelope")?;
        if !resp.success {
            return Err(Error::Api(api::Error::Unknown(
                resp.message.unwrap_or_else(|| String::from("Request failed")),
            )));
        }
        Ok(resp)
    }

    async fn fetch<R>(&self, req: RequestBuilder) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let data = self
            .send(req)
            .await?
            .data
            .context("server response has no data")?;
        Ok(serde_json::from_value(data).context("parsing server response data")?)
    }
}

#[async_trait]
impl CommentService for HttpService {
    async fn fetch_comments(
        &self,
        campaign: &CampaignId,
        page: PageRequest,
    ) -> Result<CommentPage, Error> {
        let req = self
            .client
            .get(self.url(&["comments", "campaign", campaign.as_str()])?)
            .query(&[("page", page.page), ("limit", page.limit)]);
        self.fetch(req).await
    }

    async fn fetch_replies(
        &self,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<ReplyPage, Error> {
        let req = self
            .client
            .get(self.url(&["comments", parent.as_str(), "replies"])?)
            .query(&[("page", page.page), ("limit", page.limit)]);
        self.fetch(req).await
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, Error> {
        let req = self.authed(self.client.post(self.url(&["comments"])?).json(&comment));
        let data: CommentData = self.fetch(req).await?;
        Ok(data.comment)
    }

    async fn update_comment(
        &self,
        id: &CommentId,
        update: CommentUpdate,
    ) -> Result<Comment, Error> {
        let req = self.authed(
            self.client
                .put(self.url(&["comments", id.as_str()])?)
                .json(&update),
        );
        let data: CommentData = self.fetch(req).await?;
        Ok(data.comment)
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), Error> {
        let req = self.authed(self.client.delete(self.url(&["comments", id.as_str()])?));
        self.send(req).await?;
        Ok(())
    }
}
