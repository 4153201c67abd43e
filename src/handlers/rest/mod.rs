use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use axum_macros::debug_handler;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use crate::{
    dto::{
        CreateNoteRequest, DashboardParams, DashboardResponse, PageParams, PopupNoteResponse,
        PopupResponse, SearchParams, UpdateNoteRequest,
    },
    error::NotesError,
    models::{Note, NoteWithUrl},
    query::{SortOrder, UrlFilter},
    service::NoteService,
    views::{DashboardCard, DashboardView, PopupView, WebsiteOption, popup::FixedTab},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        get_notes_for_url,
        get_all_notes,
        create_note,
        update_note,
        delete_note,
        search_notes,
        popup,
        dashboard
    ),
    components(schemas(
        Note,
        NoteWithUrl,
        CreateNoteRequest,
        UpdateNoteRequest,
        PopupResponse,
        PopupNoteResponse,
        DashboardResponse,
        DashboardCard,
        WebsiteOption,
        SortOrder
    )),
    tags(
        (name = "notes", description = "Per-page notes API")
    )
)]
pub struct ApiDoc;

pub fn router(service: Arc<NoteService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/notes", get(get_notes_for_url).post(create_note))
        .route("/notes/all", get(get_all_notes))
        .route("/notes/{id}", put(update_note).delete(delete_note))
        .route("/search", get(search_notes))
        .route("/popup", get(popup))
        .route("/dashboard", get(dashboard))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Response {
    (StatusCode::OK, "Hello from page notes!").into_response()
}

fn error_response(e: &NotesError, action: &str) -> Response {
    match e {
        NotesError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()).into_response(),
        NotesError::NotFound { .. } => (StatusCode::NOT_FOUND, "Note not found").into_response(),
        NotesError::Storage(_) => {
            tracing::error!("failed to {action}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {action}")).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    params(PageParams),
    responses(
        (status = 200, description = "Notes of the page, oldest first", body = Vec<Note>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_notes_for_url(
    State(service): State<Arc<NoteService>>,
    Query(params): Query<PageParams>,
) -> Response {
    match service.get_notes_for_url(&params.url).await {
        Ok(notes) => (StatusCode::OK, Json(notes)).into_response(),
        Err(e) => error_response(&e, "load notes"),
    }
}

#[utoipa::path(
    get,
    path = "/notes/all",
    responses(
        (status = 200, description = "Every page's notes, keyed by page URL", body = BTreeMap<String, Vec<Note>>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_all_notes(State(service): State<Arc<NoteService>>) -> Response {
    match service.get_all_notes().await {
        Ok(notes) => (StatusCode::OK, Json(notes)).into_response(),
        Err(e) => error_response(&e, "load notes"),
    }
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = Note),
        (status = 400, description = "Empty content or page URL"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(service): State<Arc<NoteService>>,
    Json(payload): Json<CreateNoteRequest>,
) -> Response {
    match service.create_note(&payload.url, payload.content).await {
        Ok(note) => (StatusCode::CREATED, Json(note)).into_response(),
        Err(e) => error_response(&e, "save note"),
    }
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated successfully", body = Note),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Response {
    match service.update_note(&payload.url, &id, payload.content).await {
        Ok(note) => (StatusCode::OK, Json(note)).into_response(),
        Err(e) => error_response(&e, "save note"),
    }
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID"),
        PageParams
    ),
    responses(
        (status = 204, description = "Note deleted, or it did not exist"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Response {
    match service.delete_note(&params.url, &id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, "delete note"),
    }
}

#[utoipa::path(
    get,
    path = "/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching notes with their page URL", body = Vec<NoteWithUrl>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn search_notes(
    State(service): State<Arc<NoteService>>,
    Query(params): Query<SearchParams>,
) -> Response {
    match service.search_notes(&params.q).await {
        Ok(notes) => (StatusCode::OK, Json(notes)).into_response(),
        Err(e) => error_response(&e, "search notes"),
    }
}

#[utoipa::path(
    get,
    path = "/popup",
    params(PageParams),
    responses(
        (status = 200, description = "Popup contents for the page", body = PopupResponse),
        (status = 400, description = "Invalid page URL"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn popup(
    State(service): State<Arc<NoteService>>,
    Query(params): Query<PageParams>,
) -> Response {
    let view = match PopupView::open(service.as_ref().clone(), &FixedTab(params.url)).await {
        Ok(view) => view,
        Err(e) => return error_response(&e, "load notes"),
    };

    let body = PopupResponse {
        url: view.url().to_string(),
        hostname: view.hostname().to_string(),
        empty_state: view.empty_state().map(str::to_string),
        notes: view.notes().iter().map(PopupNoteResponse::from).collect(),
    };

    (StatusCode::OK, Json(body)).into_response()
}

#[utoipa::path(
    get,
    path = "/dashboard",
    params(DashboardParams),
    responses(
        (status = 200, description = "Filtered, sorted and highlighted notes", body = DashboardResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn dashboard(
    State(service): State<Arc<NoteService>>,
    Query(params): Query<DashboardParams>,
) -> Response {
    let mut view = match DashboardView::load(service.as_ref().clone()).await {
        Ok(view) => view,
        Err(e) => return error_response(&e, "load notes"),
    };

    view.set_search(&params.q);
    view.set_sort(params.sort);
    view.set_website(params.website.map_or(UrlFilter::All, UrlFilter::from));

    let body = DashboardResponse {
        websites: view.website_options(),
        notes: view.cards(),
    };

    (StatusCode::OK, Json(body)).into_response()
}
