//! Story sync service: turns store reads and subscriptions into validated [`Story`] values.
//!
//! # Responsibilities
//! - Build the queries against the `"stories"` collection (newest first, slug equality, limits)
//! - Validate every record at the boundary; malformed list entries are dropped, not reported
//! - Hand out one cancellable stream per `listen_*` call; the caller owns and releases it
//! - Never touch the store from a static build context when prefetching slugs
//!
//! The store handle is injected through [`StorySync::new`].

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::contract::{
    Direction, DocumentStore, Filter, Query, Record, Snapshot, StoreError, Subscription,
};
use crate::story::{field, Story, COLLECTION};

/// Where the service is running. A static build (route pre-generation, export) must never
/// open a connection to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionContext {
    #[default]
    Client,
    StaticBuild,
}

pub struct StorySync<S: ?Sized> {
    store: Arc<S>,
    context: ExecutionContext,
    collection: String,
}

impl<S: ?Sized> Clone for StorySync<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            context: self.context,
            collection: self.collection.clone(),
        }
    }
}

impl<S> StorySync<S>
where
    S: DocumentStore + ?Sized,
{
    pub fn new(store: Arc<S>, context: ExecutionContext) -> Self {
        Self {
            store,
            context,
            collection: COLLECTION.to_string(),
        }
    }

    /// Reads from a differently-named collection (staging data, tests).
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn newest_first(&self) -> Query {
        Query::collection(&self.collection).order_by(field::CREATED_AT, Direction::Descending)
    }

    fn by_slug(&self, slug: &str) -> Query {
        Query::collection(&self.collection)
            .filter(Filter::eq(field::SLUG, slug))
            .limit(1)
    }

    /// Live list of stories, newest first. Each item is a full replacement list.
    pub fn listen_all(&self, extra_filters: Vec<Filter>) -> Result<StoryListStream, StoreError> {
        let query = self.newest_first().filters(extra_filters);
        info!(
            collection = %query.collection,
            filters = query.filters.len(),
            "[STORIES] Listening to story list"
        );
        let inner = self.store.subscribe(query)?;
        Ok(StoryListStream { inner })
    }

    /// Live view of the story with `slug`. `None` items mean "no such story".
    pub fn listen_by_slug(&self, slug: &str) -> Result<StoryStream, StoreError> {
        info!(slug, "[STORIES] Listening to story by slug");
        let inner = self.store.subscribe(self.by_slug(slug))?;
        Ok(StoryStream {
            inner,
            slug: slug.to_string(),
        })
    }

    pub async fn fetch_by_slug(&self, slug: &str) -> Result<Option<Story>, StoreError> {
        let snapshot = self.store.query_once(&self.by_slug(slug)).await?;
        let story = first_story(snapshot);
        debug!(slug, found = story.is_some(), "[STORIES] One-shot slug lookup");
        Ok(story)
    }

    /// Slugs of the newest `max` stories, de-duplicated in order. Always empty, with no
    /// store access at all, in a [`ExecutionContext::StaticBuild`] context.
    pub async fn fetch_slugs(&self, max: usize) -> Result<Vec<String>, StoreError> {
        if self.context == ExecutionContext::StaticBuild {
            debug!(max, "[STORIES] Static build context, skipping slug prefetch");
            return Ok(Vec::new());
        }
        let snapshot = self.store.query_once(&self.newest_first().limit(max)).await?;
        let mut seen = HashSet::new();
        let slugs: Vec<String> = snapshot
            .iter()
            .filter_map(|r| r.get_str(field::SLUG))
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.to_string()))
            .map(str::to_string)
            .collect();
        info!(count = slugs.len(), max, "[STORIES] Fetched slugs");
        Ok(slugs)
    }
}

/// Validates a list snapshot, keeping order and silently dropping malformed records.
pub fn stories_from_snapshot(snapshot: &[Record]) -> Vec<Story> {
    let stories: Vec<Story> = snapshot.iter().filter_map(Story::from_record).collect();
    let dropped = snapshot.len() - stories.len();
    if dropped > 0 {
        debug!(dropped, kept = stories.len(), "[STORIES] Dropped malformed records");
    }
    stories
}

fn first_story(snapshot: Snapshot) -> Option<Story> {
    snapshot.first().and_then(Story::from_lookup)
}

/// Stream of validated story lists. Dropping it releases the subscription.
#[derive(Debug)]
pub struct StoryListStream {
    inner: Subscription,
}

impl StoryListStream {
    pub async fn next(&mut self) -> Option<Result<Vec<Story>, StoreError>> {
        StreamExt::next(self).await
    }

    pub fn unsubscribe(self) {
        self.inner.unsubscribe();
    }
}

impl Stream for StoryListStream {
    type Item = Result<Vec<Story>, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner
            .poll_next_unpin(cx)
            .map(|item| item.map(|res| res.map(|snapshot| stories_from_snapshot(&snapshot))))
    }
}

/// Stream of `Some(story)` / `None` (not found) for one slug.
#[derive(Debug)]
pub struct StoryStream {
    inner: Subscription,
    slug: String,
}

impl StoryStream {
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub async fn next(&mut self) -> Option<Result<Option<Story>, StoreError>> {
        StreamExt::next(self).await
    }

    pub fn unsubscribe(self) {
        self.inner.unsubscribe();
    }
}

impl Stream for StoryStream {
    type Item = Result<Option<Story>, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let slug = self.slug.clone();
        self.inner.poll_next_unpin(cx).map(|item| {
            item.map(|res| match res {
                Ok(snapshot) => Ok(first_story(snapshot)),
                Err(e) => {
                    warn!(slug = %slug, error = %e, "[STORIES] Slug subscription failed");
                    Err(e)
                }
            })
        })
    }
}
