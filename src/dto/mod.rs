use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    models::Note,
    query::SortOrder,
    views::{DashboardCard, PopupNote, WebsiteOption},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    /// Page the note belongs to
    pub url: String,
    /// Note content
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateNoteRequest {
    /// Page the note belongs to
    pub url: String,
    /// New note content
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page URL
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive text to look for; empty matches everything
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardParams {
    /// Case-insensitive text to look for
    #[serde(default)]
    pub q: String,
    /// `newest` (by last update) or `oldest` (by creation)
    #[serde(default)]
    pub sort: SortOrder,
    /// Page URL to restrict to, or `all`
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopupNoteResponse {
    #[serde(flatten)]
    pub note: Note,
    pub updated_label: String,
}

impl From<&PopupNote> for PopupNoteResponse {
    fn from(value: &PopupNote) -> Self {
        Self {
            note: value.note.clone(),
            updated_label: value.updated_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopupResponse {
    /// Normalized page URL
    pub url: String,
    pub hostname: String,
    /// Message to show instead of the list when the page has no notes
    pub empty_state: Option<String>,
    pub notes: Vec<PopupNoteResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub websites: Vec<WebsiteOption>,
    pub notes: Vec<DashboardCard>,
}
