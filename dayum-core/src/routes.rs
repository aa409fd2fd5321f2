//! Route parameters for pre-generating story pages.
//!
//! Export builds use the predeclared slugs and never reach the store. Otherwise the
//! newest slugs are fetched through [`StorySync::fetch_slugs`]; a failure falls back to a
//! single known slug so the build still produces a page. Slugs outside the generated set
//! are resolved when requested.

use tracing::{error, info};

use crate::config::RouteConfig;
use crate::contract::DocumentStore;
use crate::slug::is_valid_slug;
use crate::stories::StorySync;

pub async fn static_params<S>(sync: &StorySync<S>, config: &RouteConfig) -> Vec<String>
where
    S: DocumentStore + ?Sized,
{
    if config.export_mode {
        info!(count = config.static_slugs.len(), "[ROUTES] Export mode, using predeclared slugs");
        return config.static_slugs.clone();
    }

    match sync.fetch_slugs(config.prefetch_limit).await {
        Ok(slugs) => {
            let slugs: Vec<String> = slugs.into_iter().filter(|s| is_valid_slug(s)).collect();
            info!(count = slugs.len(), "[ROUTES] Prefetched slugs for static params");
            slugs
        }
        Err(e) => {
            error!(error = %e, "[ROUTES] Error fetching slugs, falling back");
            vec![config.fallback_slug.clone()]
        }
    }
}
