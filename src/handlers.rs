//! HTTP adapter. Each handler resolves the bearer token, calls one core
//! operation and serializes its read-side view.

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::auth::bearer_token;
use crate::config::MAX_SEARCH_RESULTS;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{parse_uuid, secrets_match};
use crate::core::query_params::{get_int, get_string, parse_query_params};
use crate::credentials::{self, FederatedIdentity};
use crate::models::models::AccountId;
use crate::users::ProfileUpdate;
use crate::{engagement, follow, posts, users, AppState};

pub const FEDERATION_KEY_HEADER: &str = "X-Federation-Key";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/profile", web::get().to(get_own_profile))
            .route("/profile", web::put().to(update_profile))
            .route("/profile/{id}", web::get().to(get_user_profile))
            .route("/password", web::put().to(change_password))
            .route("/search", web::get().to(search_users))
            .route("/{id}/follow", web::put().to(follow_user))
            .route("/{id}/unfollow", web::put().to(unfollow_user))
            .route("/{id}/followers", web::get().to(list_followers))
            .route("/{id}/following", web::get().to(list_following)),
    )
    .service(
        web::scope("/api/posts")
            .route("", web::get().to(list_feed))
            .route("/create", web::post().to(create_post))
            .route("/feed", web::get().to(following_feed))
            .route("/user/{id}", web::get().to(list_user_posts))
            .route("/{id}/like", web::put().to(like_post))
            .route("/{id}/unlike", web::put().to(unlike_post))
            .route("/{id}/comment", web::post().to(add_comment))
            .route("/{id}", web::delete().to(delete_post)),
    )
    .service(
        web::scope("/auth")
            .route("/federated", web::post().to(federated_login))
            .route("/logout", web::post().to(logout)),
    );
}

// === Request bodies ===

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    #[serde(default, alias = "email", alias = "username")]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    pub media_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

// === Auth ===

fn raw_token(req: &HttpRequest) -> ApiResult<&str> {
    bearer_token(
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    )
}

fn authenticate(req: &HttpRequest, state: &AppState) -> ApiResult<AccountId> {
    state.tokens.verify(raw_token(req)?)
}

fn path_id(raw: &str) -> ApiResult<uuid::Uuid> {
    parse_uuid(raw)
}

fn page(req: &HttpRequest) -> usize {
    get_int(&parse_query_params(req.query_string()), "page", 1)
}

/// Runs CPU-heavy work (password hashing) off the async workers.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {}", e)))?
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let store = state.store.clone();
    let body = body.into_inner();
    let account = blocking(move || {
        credentials::register(&store, &body.username, &body.email, &body.password)
    })
    .await?;

    Ok(HttpResponse::Created().json(users::profile_view(&state.store, &account)?))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let store = state.store.clone();
    let tokens = state.tokens.clone();
    let ttl = state.config.password_token_ttl();
    let body = body.into_inner();
    let session = blocking(move || {
        credentials::login(&store, &tokens, ttl, &body.identifier, &body.password)
    })
    .await?;

    Ok(HttpResponse::Ok().json(session))
}

/// Entry point for the OAuth front door, which has already verified the
/// identity and proves itself with the shared federation key.
pub async fn federated_login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<FederatedIdentity>,
) -> ApiResult<HttpResponse> {
    let expected = state
        .config
        .federation_key
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("Federated sign-in is disabled".to_string()))?;
    let presented = req
        .headers()
        .get(FEDERATION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(presented, expected) {
        return Err(ApiError::Forbidden);
    }

    let session = credentials::login_federated(
        &state.store,
        &state.tokens,
        state.config.federated_token_ttl(),
        &body,
    )?;
    Ok(HttpResponse::Ok().json(session))
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let token = raw_token(&req)?;
    state.tokens.verify(token)?;
    state.tokens.revoke(token)?;
    Ok(HttpResponse::Ok().json(json!({"message": "Logged out successfully"})))
}

// === Profiles ===

pub async fn get_own_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let account = users::get_profile(&state.store, &account_id)?;
    Ok(HttpResponse::Ok().json(users::profile_view(&state.store, &account)?))
}

pub async fn get_user_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    authenticate(&req, &state)?;
    let account = users::get_profile(&state.store, &path_id(&path)?)?;
    Ok(HttpResponse::Ok().json(users::profile_view(&state.store, &account)?))
}

pub async fn update_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ProfileUpdate>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let account = users::update_profile(&state.store, &account_id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(users::profile_view(&state.store, &account)?))
}

/// Changing the password retires the presenting token and hands out a new one.
pub async fn change_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PasswordChangeRequest>,
) -> ApiResult<HttpResponse> {
    let token = raw_token(&req)?.to_string();
    let account_id = state.tokens.verify(&token)?;

    let store = state.store.clone();
    let body = body.into_inner();
    blocking(move || {
        credentials::change_password(&store, &account_id, &body.old_password, &body.new_password)
    })
    .await?;

    state.tokens.revoke(&token)?;
    let session = state
        .tokens
        .issue(account_id, state.config.password_token_ttl())?;
    Ok(HttpResponse::Ok().json(session))
}

pub async fn search_users(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    authenticate(&req, &state)?;
    let params = parse_query_params(req.query_string());
    let query = get_string(&params, "q", Some("")).unwrap_or_default();
    let limit = get_int(&params, "limit", MAX_SEARCH_RESULTS);
    Ok(HttpResponse::Ok().json(users::search(&state.store, &query, limit)?))
}

// === Follow graph ===

pub async fn follow_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let account = follow::follow_user(&state.store, &account_id, &path_id(&path)?)?;
    Ok(HttpResponse::Ok().json(users::profile_view(&state.store, &account)?))
}

pub async fn unfollow_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let account = follow::unfollow_user(&state.store, &account_id, &path_id(&path)?)?;
    Ok(HttpResponse::Ok().json(users::profile_view(&state.store, &account)?))
}

pub async fn list_followers(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    authenticate(&req, &state)?;
    Ok(HttpResponse::Ok().json(follow::get_followers(&state.store, &path_id(&path)?)?))
}

pub async fn list_following(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    authenticate(&req, &state)?;
    Ok(HttpResponse::Ok().json(follow::get_followings(&state.store, &path_id(&path)?)?))
}

// === Posts ===

pub async fn create_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let body = body.into_inner();
    let post = posts::create_post(&state.store, &account_id, &body.content, body.media_ref)?;
    Ok(HttpResponse::Created().json(posts::post_view(&state.store, &post)?))
}

/// The global feed needs no token.
pub async fn list_feed(req: HttpRequest, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let feed = posts::list_feed(&state.store)?;
    Ok(HttpResponse::Ok().json(posts::paginate(feed, page(&req))))
}

pub async fn following_feed(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let feed = posts::list_following_feed(&state.store, &account_id)?;
    Ok(HttpResponse::Ok().json(posts::paginate(feed, page(&req))))
}

pub async fn list_user_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    authenticate(&req, &state)?;
    let feed = posts::list_by_author(&state.store, &path_id(&path)?)?;
    Ok(HttpResponse::Ok().json(posts::paginate(feed, page(&req))))
}

pub async fn like_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let post = engagement::like_post(&state.store, &path_id(&path)?, &account_id)?;
    Ok(HttpResponse::Ok().json(posts::post_view(&state.store, &post)?))
}

pub async fn unlike_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let post = engagement::unlike_post(&state.store, &path_id(&path)?, &account_id)?;
    Ok(HttpResponse::Ok().json(posts::post_view(&state.store, &post)?))
}

pub async fn add_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    let comments = engagement::add_comment(&state.store, &path_id(&path)?, &account_id, &body.text)?;
    Ok(HttpResponse::Created().json(posts::comment_views(&state.store, &comments)?))
}

pub async fn delete_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let account_id = authenticate(&req, &state)?;
    posts::delete_post(&state.store, &path_id(&path)?, &account_id)?;
    Ok(HttpResponse::Ok().json(json!({"message": "Post deleted successfully"})))
}
