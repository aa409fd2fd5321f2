//! Reader view controller.
//!
//! Owns at most one live slug subscription and derives what the story page shows:
//! a loading indicator, the story, a "not found" message or an error with a reload
//! action. Opening a new slug always releases the previous subscription before the
//! next one is requested, and updates carry the generation they were produced for so
//! late deliveries from an old slug are discarded.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::contract::{DocumentStore, StoreError};
use crate::slug::{is_valid_slug, title_from_slug};
use crate::stories::{StoryStream, StorySync};
use crate::story::Story;

pub const PLACEHOLDER: &str =
    "No content yet. Fill the content field of this story to show it here.";
pub const LOADING_MESSAGE: &str = "Loading story…";
pub const NOT_FOUND_MESSAGE: &str = "Story not found.";
pub const ERROR_TITLE: &str = "Something went wrong";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReaderError {
    #[error("Invalid story slug: {0:?}")]
    InvalidSlug(String),
    #[error("Unable to load story: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetryAction {
    /// Full reload of the page.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorView {
    pub title: String,
    pub message: String,
    pub retry: RetryAction,
}

impl ErrorView {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            message: message.into(),
            retry: RetryAction::Reload,
        }
    }
}

impl From<&ReaderError> for ErrorView {
    fn from(err: &ReaderError) -> Self {
        ErrorView::new(err.to_string())
    }
}

/// Everything the story page renders once a story is available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryView {
    pub slug: String,
    /// The stored title, or one derived from the slug.
    pub title: String,
    pub author: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub paragraphs: Vec<String>,
    /// Shown instead of the body when there are no paragraphs.
    pub placeholder: Option<String>,
}

impl StoryView {
    pub fn from_story(story: &Story) -> Self {
        let paragraphs = story.content.as_deref().map(split_paragraphs).unwrap_or_default();
        let placeholder = paragraphs.is_empty().then(|| PLACEHOLDER.to_string());
        Self {
            slug: story.slug.clone(),
            title: display_title(story),
            author: story.author.clone(),
            excerpt: story.excerpt.clone(),
            image: story.image.clone(),
            paragraphs,
            placeholder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReaderState {
    Loading { slug: String },
    Ready(StoryView),
    NotFound { slug: String },
    Failed(ErrorView),
}

impl ReaderState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ReaderState::Loading { .. })
    }
}

/// A delivery from a slug subscription, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SlugUpdate {
    pub generation: u64,
    pub result: Result<Option<Story>, StoreError>,
}

fn paragraph_breaks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:\r?\n){2,}").expect("static regex"))
}

/// Splits story content on runs of two or more line breaks. Blocks that are blank after
/// trimming are dropped, the rest are returned trimmed and in order.
pub fn split_paragraphs(content: &str) -> Vec<String> {
    paragraph_breaks()
        .split(content)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn display_title(story: &Story) -> String {
    if story.title.trim().is_empty() {
        title_from_slug(&story.slug)
    } else {
        story.title.clone()
    }
}

pub struct ReaderController<S: ?Sized> {
    sync: StorySync<S>,
    stream: Option<StoryStream>,
    generation: u64,
    slug: Option<String>,
    state: ReaderState,
}

impl<S> ReaderController<S>
where
    S: DocumentStore + ?Sized,
{
    pub fn new(sync: StorySync<S>) -> Self {
        Self {
            sync,
            stream: None,
            generation: 0,
            slug: None,
            state: ReaderState::Loading {
                slug: String::new(),
            },
        }
    }

    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_subscribed(&self) -> bool {
        self.stream.is_some()
    }

    /// Shows `slug`. The previous subscription is released before the new one is
    /// requested. An invalid slug still drops the previous story and leaves the
    /// controller in `Failed` with no subscription.
    pub fn open(&mut self, slug: &str) -> Result<u64, ReaderError> {
        let slug = slug.trim();
        self.release();
        self.generation += 1;

        if !is_valid_slug(slug) {
            warn!(slug, "[READER] Rejected invalid slug");
            let err = ReaderError::InvalidSlug(slug.to_string());
            self.slug = None;
            self.state = ReaderState::Failed(ErrorView::from(&err));
            return Err(err);
        }

        self.slug = Some(slug.to_string());
        self.state = ReaderState::Loading {
            slug: slug.to_string(),
        };

        match self.sync.listen_by_slug(slug) {
            Ok(stream) => {
                info!(slug, generation = self.generation, "[READER] Opened story");
                self.stream = Some(stream);
            }
            Err(e) => {
                error!(slug, error = %e, "[READER] Could not subscribe");
                self.state = ReaderState::Failed(ErrorView::from(&ReaderError::Store(e)));
            }
        }
        Ok(self.generation)
    }

    /// Applies `update` unless it belongs to an earlier generation. Returns whether the
    /// state changed.
    pub fn apply(&mut self, update: SlugUpdate) -> bool {
        if update.generation != self.generation {
            debug!(
                stale = update.generation,
                current = self.generation,
                "[READER] Ignoring stale update"
            );
            return false;
        }
        let slug = self.slug.clone().unwrap_or_default();
        self.state = match update.result {
            Ok(Some(story)) => ReaderState::Ready(StoryView::from_story(&story)),
            Ok(None) => ReaderState::NotFound { slug },
            Err(e) => {
                error!(slug = %slug, error = %e, "[READER] Store failure");
                self.release();
                ReaderState::Failed(ErrorView::from(&ReaderError::Store(e)))
            }
        };
        true
    }

    /// Waits for the next delivery on the current subscription and applies it.
    /// Returns `None` once there is no live subscription left.
    pub async fn next_update(&mut self) -> Option<&ReaderState> {
        let stream = self.stream.as_mut()?;
        let generation = self.generation;
        match stream.next().await {
            Some(result) => {
                self.apply(SlugUpdate { generation, result });
                Some(&self.state)
            }
            None => {
                debug!(generation, "[READER] Subscription ended");
                self.stream = None;
                None
            }
        }
    }

    /// The retry action: re-opens the current slug with a fresh subscription.
    pub fn reload(&mut self) -> Result<u64, ReaderError> {
        let slug = self
            .slug
            .clone()
            .ok_or_else(|| ReaderError::InvalidSlug(String::new()))?;
        info!(slug = %slug, "[READER] Reloading");
        self.open(&slug)
    }

    /// Releases the live subscription, if any. The last state is kept.
    pub fn close(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!(slug = stream.slug(), "[READER] Releasing subscription");
            stream.unsubscribe();
        }
    }
}

type ErrorHook = Box<dyn Fn(&ReaderError) + Send + Sync>;

/// What the story route ends up showing after [`ReaderBoundary::mount`].
pub enum Mounted<S: ?Sized, F> {
    Reader(ReaderController<S>),
    Fallback(F),
    Error(ErrorView),
}

/// Catches slug preconditions at the edge of the story page so they become a view
/// instead of an unhandled fault.
pub struct ReaderBoundary<F> {
    fallback: Option<F>,
    on_error: Option<ErrorHook>,
}

impl<F> Default for ReaderBoundary<F> {
    fn default() -> Self {
        Self {
            fallback: None,
            on_error: None,
        }
    }
}

impl<F> ReaderBoundary<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, fallback: F) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn on_error<H>(mut self, hook: H) -> Self
    where
        H: Fn(&ReaderError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn mount<S>(self, sync: StorySync<S>, slug: Option<&str>) -> Mounted<S, F>
    where
        S: DocumentStore + ?Sized,
    {
        let mut reader = ReaderController::new(sync);
        let opened = match slug {
            Some(slug) => reader.open(slug),
            None => Err(ReaderError::InvalidSlug(String::new())),
        };
        match opened {
            Ok(_) => Mounted::Reader(reader),
            Err(e) => {
                error!(error = %e, "[READER] Story page failed to mount");
                if let Some(hook) = &self.on_error {
                    hook(&e);
                }
                match self.fallback {
                    Some(fallback) => Mounted::Fallback(fallback),
                    None => Mounted::Error(ErrorView::from(&e)),
                }
            }
        }
    }
}

/// Plain-text rendering of a reader state.
pub fn render_text(state: &ReaderState) -> String {
    let mut out = String::new();
    match state {
        ReaderState::Loading { .. } => out.push_str(LOADING_MESSAGE),
        ReaderState::NotFound { .. } => out.push_str(NOT_FOUND_MESSAGE),
        ReaderState::Failed(view) => {
            let _ = write!(out, "{}\n{}\n[Try again]", view.title, view.message);
        }
        ReaderState::Ready(view) => {
            let _ = writeln!(out, "# {}", view.title);
            if let Some(author) = &view.author {
                let _ = writeln!(out, "by {author}");
            }
            if let Some(excerpt) = &view.excerpt {
                let _ = writeln!(out, "\n> {excerpt}");
            }
            for paragraph in &view.paragraphs {
                let _ = writeln!(out, "\n{paragraph}");
            }
            if let Some(placeholder) = &view.placeholder {
                let _ = writeln!(out, "\n{placeholder}");
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(slug: &str, title: &str, content: Option<&str>) -> Story {
        Story {
            id: "doc".to_string(),
            slug: slug.to_string(),
            title: title.to_string(),
            image: None,
            excerpt: None,
            content: content.map(str::to_string),
            author: Some("Dayum".to_string()),
            created_at: None,
            updated_at: None,
            published: None,
        }
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(split_paragraphs("A\n\nB\n\n\nC"), vec!["A", "B", "C"]);
        assert_eq!(split_paragraphs("one\ntwo\r\n\r\nthree"), vec!["one\ntwo", "three"]);
        assert!(split_paragraphs("\n\n   \n\n").is_empty());
    }

    #[test]
    fn single_line_breaks_stay_in_one_block() {
        assert_eq!(split_paragraphs("Para one.\nPara two."), vec!["Para one.\nPara two."]);
        assert_eq!(split_paragraphs("Para one.\n\nPara two."), vec!["Para one.", "Para two."]);
    }

    #[test]
    fn paragraph_split_is_idempotent() {
        let once = split_paragraphs("  first  \n\n\n second\n\nthird ");
        let twice = split_paragraphs(&once.join("\n\n"));
        assert_eq!(once, twice);
    }

    #[test]
    fn view_derives_title_and_placeholder() {
        let view = StoryView::from_story(&story("virtual-art", "", None));
        assert_eq!(view.title, "Virtual Art");
        assert!(view.paragraphs.is_empty());
        assert_eq!(view.placeholder.as_deref(), Some(PLACEHOLDER));

        let view = StoryView::from_story(&story("x", "The Title", Some("Body")));
        assert_eq!(view.title, "The Title");
        assert_eq!(view.placeholder, None);
    }

    #[test]
    fn render_text_covers_each_state() {
        assert_eq!(
            render_text(&ReaderState::Loading { slug: "a".into() }),
            LOADING_MESSAGE
        );
        assert_eq!(
            render_text(&ReaderState::NotFound { slug: "a".into() }),
            NOT_FOUND_MESSAGE
        );
        let failed = render_text(&ReaderState::Failed(ErrorView::new("boom")));
        assert!(failed.starts_with(ERROR_TITLE));
        assert!(failed.ends_with("[Try again]"));

        let ready = render_text(&ReaderState::Ready(StoryView::from_story(&story(
            "a",
            "A",
            Some("p1\n\np2"),
        ))));
        assert_eq!(ready, "# A\nby Dayum\n\np1\n\np2");
    }
}
