use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{header, request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use pledge_client::api::{
    ApiResponse, AuthToken, CampaignId, CommentData, CommentId, CommentPage, CommentUpdate,
    Error as ApiError, NewComment, PageRequest, ReplyPage,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::MockServer;

pub type SharedServer = Arc<Mutex<MockServer>>;

/// The comment REST API, served from a `MockServer`
pub fn router(server: SharedServer) -> Router {
    Router::new()
        .route("/api/comments", post(create_comment))
        .route("/api/comments/campaign/:id", get(fetch_comments))
        .route("/api/comments/:id", put(update_comment).delete(delete_comment))
        .route("/api/comments/:id/replies", get(fetch_replies))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

pub struct Error(ApiError);

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Error {
        Error(err)
    }
}

impl From<QueryRejection> for Error {
    fn from(rej: QueryRejection) -> Error {
        Error(ApiError::BadRequest(rej.body_text()))
    }
}

impl From<JsonRejection> for Error {
    fn from(rej: JsonRejection) -> Error {
        Error(ApiError::BadRequest(rej.body_text()))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::info!("returning error to client: {}", self.0);
        (
            self.0.status_code(),
            [(header::CONTENT_TYPE, "application/json")],
            self.0.contents(),
        )
            .into_response()
    }
}

/// Bearer token of the request, if any. A malformed header is refused
/// rather than treated as anonymous.
pub struct Bearer(pub Option<AuthToken>);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for Bearer {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<Bearer, Error> {
        let Some(auth) = req.headers.get(header::AUTHORIZATION) else {
            return Ok(Bearer(None));
        };
        let auth = auth.to_str().map_err(|_| ApiError::Unauthenticated)?;
        let mut auth = auth.split(' ');
        if !auth
            .next()
            .ok_or(ApiError::Unauthenticated)?
            .eq_ignore_ascii_case("bearer")
        {
            return Err(ApiError::Unauthenticated.into());
        }
        let token = auth.next().ok_or(ApiError::Unauthenticated)?;
        if auth.next().is_some() || token.is_empty() {
            return Err(ApiError::Unauthenticated.into());
        }
        Ok(Bearer(Some(AuthToken(String::from(token)))))
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> PageRequest {
        PageRequest::new(q.page, q.limit)
    }
}

async fn fetch_comments(
    State(server): State<SharedServer>,
    Path(id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<CommentPage>>, Error> {
    let Query(query) = query?;
    let page = server
        .lock()
        .await
        .fetch_comments(&CampaignId::new(id), query.into())?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn fetch_replies(
    State(server): State<SharedServer>,
    Path(id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ReplyPage>>, Error> {
    let Query(query) = query?;
    let page = server
        .lock()
        .await
        .fetch_replies(&CommentId::new(id), query.into())?;
    Ok(Json(ApiResponse::ok(page)))
}

async fn create_comment(
    State(server): State<SharedServer>,
    Bearer(tok): Bearer,
    data: Result<Json<NewComment>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CommentData>>), Error> {
    let Json(data) = data?;
    let comment = server.lock().await.create_comment(tok.as_ref(), data)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            "Comment created successfully",
            CommentData { comment },
        )),
    ))
}

async fn update_comment(
    State(server): State<SharedServer>,
    Bearer(tok): Bearer,
    Path(id): Path<String>,
    data: Result<Json<CommentUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<CommentData>>, Error> {
    let Json(data) = data?;
    let comment = server
        .lock()
        .await
        .update_comment(tok.as_ref(), &CommentId::new(id), data)?;
    Ok(Json(ApiResponse::ok_with_message(
        "Comment updated successfully",
        CommentData { comment },
    )))
}

async fn delete_comment(
    State(server): State<SharedServer>,
    Bearer(tok): Bearer,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, Error> {
    server
        .lock()
        .await
        .delete_comment(tok.as_ref(), &CommentId::new(id))?;
    Ok(Json(ApiResponse {
        success: true,
        message: Some(String::from("Comment deleted successfully")),
        data: None,
    }))
}
