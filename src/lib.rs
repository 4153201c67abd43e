pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;
pub mod views;

pub use error::{NotesError, NotesResult, StoreError};
pub use models::{Note, NoteWithUrl, NotesByUrl};
pub use service::NoteService;
