//! Landing page state: rotating roles (the hero carousel), quote rotation, the name
//! banner, the secret click combo and the "enter" fade-out.
//!
//! Like [`Carousel`], everything here is driven by explicit `now_ms` values; the page
//! owns a single [`Landing`] and forwards pointer, keyboard and tick events to it.

use tracing::{debug, info};

use crate::carousel::{Carousel, CarouselError, Key, Phase, Transition};
use crate::config::LandingConfig;

pub const ROLES: [&str; 3] = ["Visual Artist", "Animator", "Writer"];

pub const THOUGHTS: [&str; 4] = [
    "Work in progress, like everything else.",
    "Broken pieces make better art.",
    "This isn't done. That's the point.",
    "Refresh. Retry. Reinvent.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

/// Side effects the page has to carry out after a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The first interaction; ambient audio may start now.
    Woke,
    QuoteAdvanced { index: usize },
    SecretRevealed,
}

#[derive(Debug, Clone)]
pub struct Landing {
    config: LandingConfig,
    roles: Carousel,
    quote: usize,
    started_at_ms: u64,
    awake: bool,
    primary_clicks: u32,
    secondary_clicked: bool,
    secret_until_ms: Option<u64>,
    navigate_at_ms: Option<u64>,
}

impl Landing {
    pub fn new(config: LandingConfig, now_ms: u64) -> Result<Self, CarouselError> {
        let roles = Carousel::new(ROLES.len(), config.hero.clone(), now_ms)?;
        info!(roles = ROLES.len(), "[LANDING] Landing page mounted");
        Ok(Self {
            config,
            roles,
            quote: 0,
            started_at_ms: now_ms,
            awake: false,
            primary_clicks: 0,
            secondary_clicked: false,
            secret_until_ms: None,
            navigate_at_ms: None,
        })
    }

    /// The role on display. It switches as soon as a step starts.
    pub fn role(&self) -> &'static str {
        let index = match self.roles.phase() {
            Phase::Animating { to, .. } => to,
            _ => self.roles.active_index(),
        };
        ROLES[index]
    }

    pub fn roles(&self) -> &Carousel {
        &self.roles
    }

    pub fn quote(&self) -> &'static str {
        THOUGHTS[self.quote]
    }

    pub fn quote_index(&self) -> usize {
        self.quote
    }

    pub fn name_visible(&self, now_ms: u64) -> bool {
        now_ms < self.started_at_ms.saturating_add(self.config.name_visible_ms)
    }

    pub fn secret_visible(&self, now_ms: u64) -> bool {
        self.secret_until_ms.is_some_and(|until| now_ms < until)
    }

    /// Whether the enter fade-out is running.
    pub fn is_leaving(&self) -> bool {
        self.navigate_at_ms.is_some()
    }

    pub fn tick(&mut self, now_ms: u64) -> Transition {
        if self.secret_until_ms.is_some_and(|until| now_ms >= until) {
            self.secret_until_ms = None;
        }
        self.roles.tick(now_ms)
    }

    pub fn key(&mut self, key: Key, now_ms: u64) -> Transition {
        self.roles.key(key, now_ms)
    }

    /// A mouse-down anywhere on the page.
    pub fn click(&mut self, button: PointerButton, now_ms: u64) -> Vec<ClickOutcome> {
        let mut outcomes = Vec::new();
        match button {
            PointerButton::Primary => self.primary_clicks += 1,
            PointerButton::Secondary => self.secondary_clicked = true,
            PointerButton::Other => {}
        }

        if self.primary_clicks >= self.config.secret_primary_clicks && self.secondary_clicked {
            self.secret_until_ms = Some(now_ms.saturating_add(self.config.secret_visible_ms));
            self.primary_clicks = 0;
            self.secondary_clicked = false;
            info!("[LANDING] Secret combo entered");
            outcomes.push(ClickOutcome::SecretRevealed);
        }

        if self.awake {
            self.quote = (self.quote + 1) % THOUGHTS.len();
            debug!(quote = self.quote, "[LANDING] Quote advanced");
            outcomes.push(ClickOutcome::QuoteAdvanced { index: self.quote });
        } else {
            self.awake = true;
            outcomes.push(ClickOutcome::Woke);
        }
        outcomes
    }

    /// The enter button. Starts the fade-out; repeated presses keep the first deadline.
    pub fn enter(&mut self, now_ms: u64) {
        if self.navigate_at_ms.is_none() {
            self.navigate_at_ms = Some(now_ms.saturating_add(self.config.enter_fade_ms));
            info!(route = %self.config.enter_target, "[LANDING] Enter pressed, fading out");
        }
    }

    /// The route to navigate to once the fade-out has finished.
    pub fn navigation_due(&self, now_ms: u64) -> Option<&str> {
        match self.navigate_at_ms {
            Some(at) if now_ms >= at => Some(self.config.enter_target.as_str()),
            _ => None,
        }
    }
}
