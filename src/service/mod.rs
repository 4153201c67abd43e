mod clock;

pub use clock::{Clock, SystemClock};

use rand::{Rng, rng};
use url::Url;

use std::sync::Arc;

use crate::{
    error::{NotesError, NotesResult},
    models::{Note, NoteWithUrl, NotesByUrl, validate_content},
    query,
    repository::{KeyValueStore, Repository},
};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_RANDOM_LEN: usize = 11;

/// CRUD and search over the notes mapping.
///
/// Clones share one repository lock: every read-modify-write cycle runs
/// while holding it, so writers inside this process never overwrite each
/// other's changes.
#[derive(Clone)]
pub struct NoteService {
    repo: Arc<tokio::sync::Mutex<Repository>>,
    clock: Arc<dyn Clock>,
}

impl NoteService {
    pub fn new(repo: Arc<tokio::sync::Mutex<Repository>>) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Arc<tokio::sync::Mutex<Repository>>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn from_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(Arc::new(tokio::sync::Mutex::new(Repository::new(store))))
    }

    /// Base-36 millisecond timestamp followed by a random base-36 tail.
    pub fn generate_id(&self) -> String {
        let millis = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or_default();

        let mut rng = rng();
        let mut id = to_base36(millis);
        id.extend(
            (0..ID_RANDOM_LEN).map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())])),
        );

        id
    }

    pub async fn get_notes_for_url(&self, url: &str) -> NotesResult<Vec<Note>> {
        let mut notes = self
            .repo
            .lock()
            .await
            .load()
            .await
            .inspect_err(|e| tracing::error!("Error fetching notes: {e}"))?;

        Ok(notes.remove(&page_key(url)).unwrap_or_default())
    }

    pub async fn get_all_notes(&self) -> NotesResult<NotesByUrl> {
        self.repo
            .lock()
            .await
            .load()
            .await
            .inspect_err(|e| tracing::error!("Error fetching all notes: {e}"))
            .map_err(Into::into)
    }

    pub async fn create_note(&self, url: &str, content: String) -> NotesResult<Note> {
        validate_url(url)?;
        validate_content(&content)?;
        let url = page_key(url);

        let repo = self.repo.lock().await;
        let mut notes = repo
            .load()
            .await
            .inspect_err(|e| tracing::error!("Error creating note: {e}"))?;

        let bucket = notes.entry(url.clone()).or_default();

        let mut id = self.generate_id();
        while bucket.iter().any(|note| note.id == id) {
            id = self.generate_id();
        }

        let note = Note::new(id, content, self.clock.now())?;
        bucket.push(note.clone());

        repo.save(&notes)
            .await
            .inspect_err(|e| tracing::error!("Error creating note: {e}"))?;

        tracing::debug!("Created note '{}' for '{}'", note.id, url);

        Ok(note)
    }

    pub async fn update_note(&self, url: &str, id: &str, content: String) -> NotesResult<Note> {
        validate_content(&content)?;
        let url = page_key(url);

        let repo = self.repo.lock().await;
        let mut notes = repo
            .load()
            .await
            .inspect_err(|e| tracing::error!("Error updating note: {e}"))?;

        let note = notes
            .get_mut(&url)
            .and_then(|bucket| bucket.iter_mut().find(|note| note.id == id))
            .ok_or_else(|| NotesError::NotFound {
                url: url.clone(),
                id: id.to_string(),
            })?;

        note.revise(content, self.clock.now())?;
        let updated = note.clone();

        repo.save(&notes)
            .await
            .inspect_err(|e| tracing::error!("Error updating note: {e}"))?;

        tracing::debug!("Updated note '{}' for '{}'", id, url);

        Ok(updated)
    }

    /// Removes a note, dropping the page entirely once its last note is
    /// gone. Returns whether anything was removed; a missing note is not an
    /// error and leaves the store untouched.
    pub async fn delete_note(&self, url: &str, id: &str) -> NotesResult<bool> {
        let url = page_key(url);
        let repo = self.repo.lock().await;
        let mut notes = repo
            .load()
            .await
            .inspect_err(|e| tracing::error!("Error deleting note: {e}"))?;

        let Some(bucket) = notes.get_mut(&url) else {
            return Ok(false);
        };

        let before = bucket.len();
        bucket.retain(|note| note.id != id);
        if bucket.len() == before {
            return Ok(false);
        }

        if bucket.is_empty() {
            notes.remove(&url);
        }

        repo.save(&notes)
            .await
            .inspect_err(|e| tracing::error!("Error deleting note: {e}"))?;

        tracing::debug!("Deleted note '{}' for '{}'", id, url);

        Ok(true)
    }

    pub async fn search_notes(&self, query: &str) -> NotesResult<Vec<NoteWithUrl>> {
        let notes = self
            .get_all_notes()
            .await
            .inspect_err(|e| tracing::error!("Error searching notes: {e}"))?;

        Ok(query::filter_by_text(&query::flatten(&notes), query))
    }
}

fn validate_url(url: &str) -> NotesResult<()> {
    if url.trim().is_empty() {
        return Err(NotesError::Validation("page url must not be empty".to_string()));
    }

    Ok(())
}

/// Key a page is stored under: the serialized form of its parsed URL, so
/// `https://a.com` and `https://a.com/` share one bucket. Strings that do
/// not parse as a URL are used as given.
fn page_key(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), String::from)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ID_ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();

    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use std::{collections::HashSet, sync::Mutex};

    use crate::{error::StoreError, repository::MemoryStore};

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn starting_at(ms: i64) -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc.timestamp_millis_opt(ms).unwrap())))
        }

        fn advance(&self, ms: i64) {
            *self.0.lock().unwrap() += Duration::milliseconds(ms);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn service_with(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> NoteService {
        NoteService::with_clock(
            Arc::new(tokio::sync::Mutex::new(Repository::new(store))),
            clock,
        )
    }

    fn create_service() -> (NoteService, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(1_700_000_000_000);
        (service_with(Arc::new(MemoryStore::new()), clock.clone()), clock)
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn generate_id_has_time_prefix_and_random_tail() {
        let (service, _clock) = create_service();

        let id = service.generate_id();

        assert!(id.starts_with("loyw3v28"));
        assert_eq!(id.len(), "loyw3v28".len() + ID_RANDOM_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn generate_id_does_not_repeat_within_same_millisecond() {
        let (service, _clock) = create_service();

        let ids: HashSet<String> = (0..10_000).map(|_| service.generate_id()).collect();

        assert_eq!(ids.len(), 10_000);
    }

    #[tokio::test]
    async fn test_create_note() {
        let (service, _clock) = create_service();

        let note = service
            .create_note("https://a.com/", "Buy milk".to_string())
            .await
            .unwrap();

        let notes = service.get_notes_for_url("https://a.com/").await.unwrap();
        assert_eq!(notes, vec![note.clone()]);
        assert_eq!(note.content, "Buy milk");
        assert_eq!(note.created_at, note.updated_at);
    }

    #[tokio::test]
    async fn test_create_note_appends_in_creation_order() {
        let (service, clock) = create_service();

        let first = service.create_note("https://a.com/", "one".to_string()).await.unwrap();
        clock.advance(10);
        let second = service.create_note("https://a.com/", "two".to_string()).await.unwrap();

        let notes = service.get_notes_for_url("https://a.com/").await.unwrap();
        assert_eq!(
            notes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
            vec![first.id.as_str(), second.id.as_str()]
        );
    }

    #[tokio::test]
    async fn test_create_note_rejects_blank_content_before_storage() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), ManualClock::starting_at(0));
        store.close();

        let result = service.create_note("https://a.com/", "   ".to_string()).await;

        assert!(matches!(result, Err(NotesError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_note_rejects_blank_url() {
        let (service, _clock) = create_service();

        let result = service.create_note(" ", "content".to_string()).await;

        assert!(matches!(result, Err(NotesError::Validation(_))));
        assert!(service.get_all_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rapid_creations_have_unique_ids() {
        let (service, _clock) = create_service();

        for i in 0..200 {
            service
                .create_note("https://a.com/", format!("note {i}"))
                .await
                .unwrap();
        }

        let notes = service.get_notes_for_url("https://a.com/").await.unwrap();
        let ids: HashSet<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[tokio::test]
    async fn test_get_notes_for_unknown_url_is_empty() {
        let (service, _clock) = create_service();

        assert!(service.get_notes_for_url("https://nowhere.org/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_notes_on_empty_store() {
        let (service, _clock) = create_service();

        assert!(service.get_all_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_note() {
        let (service, clock) = create_service();
        let created = service
            .create_note("https://a.com/", "Original content".to_string())
            .await
            .unwrap();

        clock.advance(1_000);
        let updated = service
            .update_note("https://a.com/", &created.id, "Updated content".to_string())
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.content, "Updated content");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let stored = service.get_notes_for_url("https://a.com/").await.unwrap();
        assert_eq!(stored, vec![updated]);
    }

    #[tokio::test]
    async fn test_update_note_advances_without_clock_movement() {
        let (service, _clock) = create_service();
        let created = service.create_note("https://a.com/", "a".to_string()).await.unwrap();

        let first = service
            .update_note("https://a.com/", &created.id, "b".to_string())
            .await
            .unwrap();
        let second = service
            .update_note("https://a.com/", &created.id, "c".to_string())
            .await
            .unwrap();

        assert!(first.updated_at > created.updated_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.content, "c");
        assert_eq!(
            service.get_notes_for_url("https://a.com/").await.unwrap()[0].content,
            "c"
        );
    }

    #[tokio::test]
    async fn test_update_note_not_found() {
        let (service, _clock) = create_service();
        let created = service.create_note("https://a.com/", "a".to_string()).await.unwrap();

        let wrong_id = service
            .update_note("https://a.com/", "missing", "b".to_string())
            .await;
        let wrong_url = service
            .update_note("https://b.com/", &created.id, "b".to_string())
            .await;

        assert!(matches!(wrong_id, Err(NotesError::NotFound { .. })));
        assert!(matches!(wrong_url, Err(NotesError::NotFound { .. })));
        assert!(!service.get_all_notes().await.unwrap().contains_key("https://b.com/"));
    }

    #[tokio::test]
    async fn test_update_note_rejects_blank_content() {
        let (service, _clock) = create_service();
        let created = service.create_note("https://a.com/", "keep".to_string()).await.unwrap();

        let result = service
            .update_note("https://a.com/", &created.id, "\n".to_string())
            .await;

        assert!(matches!(result, Err(NotesError::Validation(_))));
        assert_eq!(
            service.get_notes_for_url("https://a.com/").await.unwrap(),
            vec![created]
        );
    }

    #[tokio::test]
    async fn test_delete_last_note_prunes_url() {
        let (service, _clock) = create_service();
        let created = service.create_note("https://a.com/", "only".to_string()).await.unwrap();

        assert!(service.delete_note("https://a.com/", &created.id).await.unwrap());

        assert!(!service.get_all_notes().await.unwrap().contains_key("https://a.com/"));
    }

    #[tokio::test]
    async fn test_delete_keeps_remaining_notes() {
        let (service, _clock) = create_service();
        let first = service.create_note("https://a.com/", "one".to_string()).await.unwrap();
        let second = service.create_note("https://a.com/", "two".to_string()).await.unwrap();

        service.delete_note("https://a.com/", &first.id).await.unwrap();

        assert_eq!(
            service.get_notes_for_url("https://a.com/").await.unwrap(),
            vec![second]
        );
    }

    #[tokio::test]
    async fn test_delete_missing_note_is_noop() {
        let (service, _clock) = create_service();
        service.create_note("https://a.com/", "one".to_string()).await.unwrap();
        let before = service.get_all_notes().await.unwrap();

        assert!(!service.delete_note("https://a.com/", "missing").await.unwrap());
        assert!(!service.delete_note("https://b.com/", "missing").await.unwrap());

        assert_eq!(service.get_all_notes().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_equivalent_page_urls_share_one_bucket() {
        let (service, _clock) = create_service();

        let created = service.create_note("https://a.com", "bare".to_string()).await.unwrap();
        service.create_note("HTTPS://A.COM/", "upper".to_string()).await.unwrap();

        let all = service.get_all_notes().await.unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["https://a.com/"]);
        assert_eq!(service.get_notes_for_url("https://a.com").await.unwrap().len(), 2);

        let updated = service
            .update_note("https://a.com", &created.id, "edited".to_string())
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");
        assert!(service.delete_note("https://a.com", &created.id).await.unwrap());
        assert_eq!(service.get_notes_for_url("https://a.com/").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_url_page_key_is_kept_as_given() {
        let (service, _clock) = create_service();

        service.create_note("local page", "one".to_string()).await.unwrap();

        let all = service.get_all_notes().await.unwrap();
        assert!(all.contains_key("local page"));
        assert_eq!(service.get_notes_for_url("local page").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_notes() {
        let (service, clock) = create_service();
        let milk = service.create_note("https://a.com/", "Buy milk".to_string()).await.unwrap();
        clock.advance(5);
        let eggs = service.create_note("https://a.com/", "Buy eggs".to_string()).await.unwrap();
        clock.advance(5);
        service.create_note("https://b.com/", "Call mom".to_string()).await.unwrap();

        let results = service.search_notes("buy").await.unwrap();

        assert_eq!(
            results,
            vec![
                NoteWithUrl {
                    note: milk,
                    url: "https://a.com/".to_string()
                },
                NoteWithUrl {
                    note: eggs,
                    url: "https://a.com/".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_search_with_empty_query_matches_all() {
        let (service, _clock) = create_service();
        service.create_note("https://a.com/", "Buy milk".to_string()).await.unwrap();
        service.create_note("https://b.com/", "Call mom".to_string()).await.unwrap();

        assert_eq!(service.search_notes("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_not_lost() {
        let (service, _clock) = create_service();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_note("https://a.com/", format!("note {i}"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(service.get_notes_for_url("https://a.com/").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), ManualClock::starting_at(0));
        store.close();

        assert!(matches!(
            service.get_all_notes().await,
            Err(NotesError::Storage(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            service.create_note("https://a.com/", "x".to_string()).await,
            Err(NotesError::Storage(_))
        ));
        assert!(matches!(
            service.delete_note("https://a.com/", "x").await,
            Err(NotesError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_quota_failure_leaves_state_untouched() {
        let store = Arc::new(MemoryStore::with_quota(300));
        let service = service_with(store, ManualClock::starting_at(0));
        service.create_note("https://a.com/", "short".to_string()).await.unwrap();
        let before = service.get_all_notes().await.unwrap();

        let result = service.create_note("https://a.com/", "z".repeat(400)).await;

        assert!(matches!(
            result,
            Err(NotesError::Storage(StoreError::QuotaExceeded { .. }))
        ));
        assert_eq!(service.get_all_notes().await.unwrap(), before);
    }
}
