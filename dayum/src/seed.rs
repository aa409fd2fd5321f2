//! Demo content: the stories the seed command writes, and the in-memory store used by `--memory`.

use chrono::Utc;
use dayum_core::contract::{DocumentWriter, Fields, StoreError};
use dayum_core::memory::InMemoryStore;
use dayum_core::slug::slugify;
use dayum_core::story::field;
use serde_json::{json, Value};
use tracing::info;

pub struct DemoStory {
    pub title: &'static str,
    pub image: &'static str,
    pub excerpt: &'static str,
}

pub const DEMO_STORIES: [DemoStory; 3] = [
    DemoStory {
        title: "The Haunted House",
        image: "/images/haunted-house.jpg",
        excerpt: "A spooky story of an abandoned house...",
    },
    DemoStory {
        title: "Space Adventures",
        image: "/images/space-adventures.jpg",
        excerpt: "Exploring the universe and beyond...",
    },
    DemoStory {
        title: "The Secret Garden",
        image: "/images/secret-garden.jpg",
        excerpt: "A magical place hidden from the world...",
    },
];

impl DemoStory {
    pub fn fields(&self, created_at_ms: i64) -> Fields {
        let mut fields = Fields::new();
        fields.insert(field::TITLE.to_string(), json!(self.title));
        fields.insert(field::SLUG.to_string(), json!(slugify(self.title)));
        fields.insert(field::IMAGE.to_string(), json!(self.image));
        fields.insert(field::EXCERPT.to_string(), json!(self.excerpt));
        fields.insert(field::CREATED_AT.to_string(), Value::from(created_at_ms));
        fields
    }
}

/// Writes the demo stories one by one, in order. Returns the assigned ids.
pub async fn seed<W>(writer: &W, collection: &str) -> Result<Vec<String>, StoreError>
where
    W: DocumentWriter + ?Sized,
{
    let now = Utc::now().timestamp_millis();
    let mut ids = Vec::with_capacity(DEMO_STORIES.len());
    for story in &DEMO_STORIES {
        let id = writer.add(collection, story.fields(now)).await?;
        info!(title = story.title, id = %id, "[SEED] Added story");
        ids.push(id);
    }
    info!(count = ids.len(), "[SEED] Seeding complete");
    Ok(ids)
}

/// An in-memory store holding the demo stories and one story per home page category.
pub fn demo_store(collection: &str) -> InMemoryStore {
    let store = InMemoryStore::new();
    let base = Utc::now().timestamp_millis();
    for (offset, story) in DEMO_STORIES.iter().enumerate() {
        let slug = slugify(story.title);
        let mut fields = story.fields(base - offset as i64);
        fields.insert(
            field::CONTENT.to_string(),
            json!(format!(
                "{}\n\nThe rest of {} is still being written.",
                story.excerpt, story.title
            )),
        );
        store.insert(collection, slug, fields);
    }
    let categories = [
        ("coding", "Coding"),
        ("writing", "Writing"),
        ("virtual-art", ""),
    ];
    for (offset, (slug, title)) in categories.into_iter().enumerate() {
        let mut fields = Fields::new();
        fields.insert(field::SLUG.to_string(), json!(slug));
        fields.insert(field::TITLE.to_string(), json!(title));
        fields.insert(field::AUTHOR.to_string(), json!("Dayum"));
        fields.insert(
            field::CREATED_AT.to_string(),
            Value::from(base - 1_000 - offset as i64),
        );
        store.insert(collection, slug, fields);
    }
    store
}
