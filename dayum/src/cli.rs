///
/// This module implements the CLI for the Project Dayum site core: command parsing, store
/// selection and printing of whatever the core produces.
///
/// All data models, state machines and sync logic live in the [`dayum-core`] crate.
/// This module is strictly glue: pick a store, wire it into the core services, print results.
///
/// ## Features
/// - Entry struct [`Cli`] defines all user-facing subcommands.
/// - `--memory` on every store command swaps Firestore for a seeded in-memory store.
/// - Async entrypoint ([`run`]) for programmatic invocation and integration testing.
///
/// [`dayum-core`]: ../../dayum-core/
use crate::firestore::FirestoreClient;
use crate::load_config::{resolve_config, CliConfig};
use crate::seed::{demo_store, seed};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dayum_core::carousel::Transition;
use dayum_core::contract::{DocumentStore, DocumentWriter};
use dayum_core::deck::{default_cards, Deck};
use dayum_core::reader::{render_text, Mounted, ReaderBoundary, ReaderState};
use dayum_core::routes::static_params;
use dayum_core::stories::{ExecutionContext, StorySync};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for the Project Dayum site: story sync, reader and carousel tooling.
#[derive(Parser)]
#[clap(
    name = "dayum",
    version,
    about = "Seed, list, read and pre-render stories of the Project Dayum portfolio"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Use a seeded in-memory store instead of Firestore
    #[clap(long)]
    pub memory: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the demo stories to the store
    Seed {
        #[clap(flatten)]
        store: StoreArgs,
    },
    /// List stories, newest first
    Stories {
        #[clap(flatten)]
        store: StoreArgs,
        /// Keep printing the list as it changes
        #[clap(long)]
        watch: bool,
        /// Stop watching after this many lists
        #[clap(long)]
        updates: Option<usize>,
    },
    /// Render one story by slug
    Read {
        slug: String,
        #[clap(flatten)]
        store: StoreArgs,
        /// Keep rendering the story as it changes
        #[clap(long)]
        watch: bool,
        /// Stop watching after this many renders
        #[clap(long)]
        updates: Option<usize>,
    },
    /// Print the story slugs to pre-render
    Routes {
        #[clap(flatten)]
        store: StoreArgs,
        /// Resolve as a client would instead of as a static build
        #[clap(long)]
        client: bool,
    },
    /// Simulate the home page card deck auto-advancing
    Deck {
        #[clap(long)]
        config: Option<PathBuf>,
        /// Number of timer-driven transitions to simulate
        #[clap(long, default_value_t = 5)]
        steps: usize,
    },
}

fn open_store(config: &CliConfig, memory: bool) -> Result<Arc<dyn DocumentStore>> {
    if memory {
        tracing::info!("Using in-memory demo store");
        return Ok(Arc::new(demo_store(&config.store.collection)));
    }
    Ok(Arc::new(FirestoreClient::new_from_env(&config.store)?))
}

fn story_sync(
    config: &CliConfig,
    memory: bool,
    context: ExecutionContext,
) -> Result<StorySync<dyn DocumentStore>> {
    let store = open_store(config, memory)?;
    Ok(StorySync::new(store, context).with_collection(config.store.collection.clone()))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Seed { store } => {
            let config = resolve_config(store.config.as_deref())?;
            tracing::info!(command = "seed", memory = store.memory, "Seeding demo stories");
            let writer: Arc<dyn DocumentWriter> = if store.memory {
                Arc::new(demo_store(&config.store.collection))
            } else {
                Arc::new(FirestoreClient::new_from_env(&config.store)?)
            };
            let ids = seed(writer.as_ref(), &config.store.collection)
                .await
                .map_err(|e| anyhow::anyhow!("Seeding failed: {e}"))?;
            for id in &ids {
                println!("Added: {id}");
            }
            println!("Seeding complete ({} stories)", ids.len());
            Ok(())
        }
        Commands::Stories {
            store,
            watch,
            updates,
        } => {
            let config = resolve_config(store.config.as_deref())?;
            let sync = story_sync(&config, store.memory, ExecutionContext::Client)?;
            let limit = match (watch, updates) {
                (false, _) => 1,
                (true, Some(n)) => n,
                (true, None) => usize::MAX,
            };
            let mut lists = sync.listen_all(vec![])?.take(limit);
            while let Some(list) = lists.next().await {
                let stories = list.map_err(|e| {
                    tracing::error!(command = "stories", error = %e, "Story list failed");
                    anyhow::anyhow!("Story list failed: {e}")
                })?;
                tracing::info!(command = "stories", count = stories.len(), "Story list received");
                for story in &stories {
                    println!("{}\t{}", story.slug, story.title);
                }
                if watch {
                    println!("--");
                }
            }
            Ok(())
        }
        Commands::Read {
            slug,
            store,
            watch,
            updates,
        } => {
            let config = resolve_config(store.config.as_deref())?;
            let sync = story_sync(&config, store.memory, ExecutionContext::Client)?;
            let mounted = ReaderBoundary::new()
                .with_fallback(format!(
                    "No story can live at {slug:?}. \
                     Run `dayum stories` to list the available slugs."
                ))
                .on_error(|e| {
                    tracing::warn!(command = "read", error = %e, "Reader boundary caught an error")
                })
                .mount(sync, Some(slug.as_str()));
            let mut reader = match mounted {
                Mounted::Reader(reader) => reader,
                Mounted::Fallback(text) => {
                    println!("{text}");
                    return Ok(());
                }
                Mounted::Error(view) => {
                    println!("{}", render_text(&ReaderState::Failed(view)));
                    return Ok(());
                }
            };

            let mut rendered = 0;
            if !reader.state().is_loading() {
                println!("{}", render_text(reader.state()));
                return Ok(());
            }
            while let Some(state) = reader.next_update().await {
                println!("{}", render_text(state));
                rendered += 1;
                let done = match (watch, updates) {
                    (false, _) => true,
                    (true, Some(n)) => rendered >= n,
                    (true, None) => false,
                };
                if done {
                    break;
                }
                if watch {
                    println!("--");
                }
            }
            reader.close();
            Ok(())
        }
        Commands::Routes { store, client } => {
            let config = resolve_config(store.config.as_deref())?;
            let context = if client {
                ExecutionContext::Client
            } else {
                ExecutionContext::StaticBuild
            };
            tracing::info!(
                command = "routes",
                export_mode = config.routes.export_mode,
                ?context,
                "Resolving static params"
            );
            // Export builds never contact the store, so they need no client either.
            let slugs = if config.routes.export_mode {
                config.routes.static_slugs.clone()
            } else {
                let sync = story_sync(&config, store.memory, context)?;
                static_params(&sync, &config.routes).await
            };
            for slug in &slugs {
                println!("{slug}");
            }
            Ok(())
        }
        Commands::Deck { config, steps } => {
            let config = resolve_config(config.as_deref())?;
            let mut deck = Deck::new(default_cards(), config.deck.clone(), 0)?;
            let mut now = 0;
            let mut done = 0;
            println!("0ms\t{}\t{}", deck.active().title, deck.active().link());
            while done < steps {
                let Some(deadline) = deck.carousel().next_deadline() else {
                    tracing::warn!(command = "deck", "Deck has no pending deadline, stopping");
                    break;
                };
                now = deadline.max(now);
                if let Transition::Settled { .. } = deck.tick(now) {
                    done += 1;
                    println!("{now}ms\t{}\t{}", deck.active().title, deck.active().link());
                }
            }
            let placed = serde_json::to_string(&deck.placed())?;
            println!("{placed}");
            Ok(())
        }
    }
}
