use async_trait::async_trait;
use url::Url;

use crate::{
    error::{NotesError, NotesResult},
    models::Note,
    service::NoteService,
    views::format_timestamp,
};

pub const EMPTY_STATE: &str = "No notes yet. Create one above!";

/// Resolves the page the popup was opened on.
#[async_trait]
pub trait TabSource: Send + Sync {
    async fn current_tab_url(&self) -> NotesResult<String>;
}

/// A tab that is known up front.
pub struct FixedTab(pub String);

#[async_trait]
impl TabSource for FixedTab {
    async fn current_tab_url(&self) -> NotesResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupNote {
    pub note: Note,
    pub mode: EditMode,
}

impl PopupNote {
    const fn viewing(note: Note) -> Self {
        Self {
            note,
            mode: EditMode::Viewing,
        }
    }

    pub fn updated_label(&self) -> String {
        format!("Last updated: {}", format_timestamp(&self.note.updated_at))
    }
}

/// Notes of the active tab's page, with a per-note edit toggle.
///
/// The list is a cache: it is patched from the value each service call
/// returns and must be reloaded after a failed mutation.
pub struct PopupView {
    service: NoteService,
    url: String,
    hostname: String,
    notes: Vec<PopupNote>,
}

impl PopupView {
    pub async fn open(service: NoteService, tabs: &dyn TabSource) -> NotesResult<Self> {
        let page = Url::parse(&tabs.current_tab_url().await?)?;
        let hostname = page.host_str().unwrap_or_else(|| page.as_str()).to_string();

        let mut view = Self {
            service,
            url: page.to_string(),
            hostname,
            notes: Vec::new(),
        };
        view.reload().await?;

        Ok(view)
    }

    pub async fn reload(&mut self) -> NotesResult<()> {
        self.notes = self
            .service
            .get_notes_for_url(&self.url)
            .await?
            .into_iter()
            .map(PopupNote::viewing)
            .collect();

        Ok(())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn notes(&self) -> &[PopupNote] {
        &self.notes
    }

    pub fn empty_state(&self) -> Option<&'static str> {
        self.notes.is_empty().then_some(EMPTY_STATE)
    }

    /// Creates a note from the input box. Blank input is ignored. The new
    /// note is shown at the top of the list.
    pub async fn add(&mut self, input: &str) -> NotesResult<Option<Note>> {
        let content = input.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let note = self.service.create_note(&self.url, content.to_string()).await?;
        self.notes.insert(0, PopupNote::viewing(note.clone()));

        Ok(Some(note))
    }

    pub fn mode(&self, id: &str) -> Option<EditMode> {
        self.notes.iter().find(|n| n.note.id == id).map(|n| n.mode)
    }

    /// Viewing -> Editing. Clicking edit on a note already being edited
    /// leaves it in edit mode.
    pub fn edit_click(&mut self, id: &str) -> NotesResult<()> {
        self.card_mut(id)?.mode = EditMode::Editing;

        Ok(())
    }

    /// Editing -> Viewing, persisting the edited content. On failure the
    /// note stays in edit mode so the text is not lost.
    pub async fn save_click(&mut self, id: &str, content: &str) -> NotesResult<Note> {
        if self.card_mut(id)?.mode != EditMode::Editing {
            return Err(NotesError::Validation(format!(
                "note '{id}' is not being edited"
            )));
        }

        let updated = self
            .service
            .update_note(&self.url, id, content.to_string())
            .await?;

        let card = self.card_mut(id)?;
        card.note = updated.clone();
        card.mode = EditMode::Viewing;

        Ok(updated)
    }

    pub async fn delete(&mut self, id: &str) -> NotesResult<()> {
        self.service.delete_note(&self.url, id).await?;
        self.notes.retain(|n| n.note.id != id);

        Ok(())
    }

    fn card_mut(&mut self, id: &str) -> NotesResult<&mut PopupNote> {
        self.notes
            .iter_mut()
            .find(|n| n.note.id == id)
            .ok_or_else(|| NotesError::NotFound {
                url: self.url.clone(),
                id: id.to_string(),
            })
    }
}
