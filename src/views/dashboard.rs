use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::NotesResult,
    models::{Note, NoteWithUrl, NotesByUrl},
    query::{self, DashboardQuery, SortOrder, UrlFilter},
    service::NoteService,
    views::{format_timestamp, hostname},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WebsiteOption {
    /// Filter value: a page URL, or `all`
    pub value: String,
    /// Label shown in the website picker
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCard {
    #[serde(flatten)]
    pub note: NoteWithUrl,
    /// Host the note's page lives on
    pub hostname: String,
    /// HTML-escaped content with search matches highlighted
    pub content_html: String,
    pub updated_label: String,
}

/// "All Websites" followed by one entry per page that has notes.
pub fn website_options(notes: &NotesByUrl) -> Vec<WebsiteOption> {
    std::iter::once(WebsiteOption {
        value: UrlFilter::ALL.to_string(),
        label: "All Websites".to_string(),
    })
    .chain(notes.keys().map(|url| WebsiteOption {
        value: url.clone(),
        label: hostname(url),
    }))
    .collect()
}

pub fn render_cards(notes: &NotesByUrl, query: &DashboardQuery) -> Vec<DashboardCard> {
    let terms = query.text.trim();

    query::apply(notes, query)
        .into_iter()
        .map(|note| DashboardCard {
            hostname: hostname(&note.url),
            content_html: query::highlight_html(&note.note.content, terms),
            updated_label: format!("Updated: {}", format_timestamp(&note.note.updated_at)),
            note,
        })
        .collect()
}

/// Every note across every page, narrowed by search text, page and order.
///
/// Holds a snapshot of the mapping that is patched from each mutation's
/// result instead of being reloaded.
pub struct DashboardView {
    service: NoteService,
    notes: NotesByUrl,
    query: DashboardQuery,
}

impl DashboardView {
    pub async fn load(service: NoteService) -> NotesResult<Self> {
        let notes = service.get_all_notes().await?;

        Ok(Self {
            service,
            notes,
            query: DashboardQuery::default(),
        })
    }

    pub async fn reload(&mut self) -> NotesResult<()> {
        self.notes = self.service.get_all_notes().await?;
        self.forget_missing_website();

        Ok(())
    }

    pub const fn notes(&self) -> &NotesByUrl {
        &self.notes
    }

    pub const fn query(&self) -> &DashboardQuery {
        &self.query
    }

    pub fn set_search(&mut self, text: &str) {
        self.query.text = text.to_string();
    }

    pub const fn set_sort(&mut self, order: SortOrder) {
        self.query.order = order;
    }

    pub fn set_website(&mut self, website: UrlFilter) {
        self.query.website = website;
    }

    pub fn website_options(&self) -> Vec<WebsiteOption> {
        website_options(&self.notes)
    }

    pub fn cards(&self) -> Vec<DashboardCard> {
        render_cards(&self.notes, &self.query)
    }

    /// Saves the edit dialog. Blank input is ignored.
    pub async fn save_edit(&mut self, url: &str, id: &str, content: &str) -> NotesResult<Option<Note>> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let updated = self.service.update_note(url, id, content.to_string()).await?;

        if let Some(slot) = self
            .notes
            .get_mut(url)
            .and_then(|bucket| bucket.iter_mut().find(|note| note.id == id))
        {
            *slot = updated.clone();
        }

        Ok(Some(updated))
    }

    pub async fn delete(&mut self, url: &str, id: &str) -> NotesResult<()> {
        self.service.delete_note(url, id).await?;

        if let Some(bucket) = self.notes.get_mut(url) {
            bucket.retain(|note| note.id != id);
            if bucket.is_empty() {
                self.notes.remove(url);
                self.forget_missing_website();
            }
        }

        Ok(())
    }

    fn forget_missing_website(&mut self) {
        let missing = matches!(
            &self.query.website,
            UrlFilter::Url(url) if !self.notes.contains_key(url)
        );

        if missing {
            self.query.website = UrlFilter::All;
        }
    }
}
