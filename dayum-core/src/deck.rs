//! The home page card deck: one card per category, rotating through a [`Carousel`].

use serde::Serialize;
use tracing::info;

use crate::carousel::{Carousel, CarouselError, Gesture, ItemTransform, Transition};
use crate::config::CarouselConfig;
use crate::slug::slugify;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub title: String,
    pub image: String,
}

impl Card {
    pub fn new(title: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image: image.into(),
        }
    }

    pub fn slug(&self) -> String {
        slugify(&self.title)
    }

    /// Route of the story page behind this card.
    pub fn link(&self) -> String {
        format!("/stories/{}", self.slug())
    }
}

pub fn default_cards() -> Vec<Card> {
    vec![
        Card::new("Coding", "/assets/home/coding.jpg"),
        Card::new("Writing", "/assets/home/writing.jpg"),
        Card::new("Virtual Art", "/assets/home/virtualart.jpg"),
        Card::new("Gaming", "/assets/home/gaming.jpg"),
        Card::new("3-D", "/assets/home/3d.jpg"),
    ]
}

/// Result of clicking a card.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// The centred card was clicked; leave for its page.
    Open(String),
    Moved(Transition),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedCard<'a> {
    pub card: &'a Card,
    pub transform: ItemTransform,
}

#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    carousel: Carousel,
}

impl Deck {
    pub fn new(
        cards: Vec<Card>,
        config: CarouselConfig,
        now_ms: u64,
    ) -> Result<Self, CarouselError> {
        let carousel = Carousel::new(cards.len(), config, now_ms)?;
        info!(cards = cards.len(), "[DECK] Card deck mounted");
        Ok(Self { cards, carousel })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn active(&self) -> &Card {
        &self.cards[self.carousel.active_index()]
    }

    pub fn tick(&mut self, now_ms: u64) -> Transition {
        self.carousel.tick(now_ms)
    }

    pub fn grab(&mut self, now_ms: u64) -> Transition {
        self.carousel.grab(now_ms)
    }

    pub fn drag(&mut self, offset: f32) {
        self.carousel.drag(offset)
    }

    pub fn release(&mut self, gesture: Gesture, now_ms: u64) -> Transition {
        self.carousel.release(gesture, now_ms)
    }

    /// Navigation dot.
    pub fn select(&mut self, index: usize, now_ms: u64) -> Result<Transition, CarouselError> {
        self.carousel.go_to(index, now_ms)
    }

    pub fn activate(&mut self, index: usize, now_ms: u64) -> Result<Activation, CarouselError> {
        if index == self.carousel.active_index() && !self.carousel.is_animating() {
            let link = self.cards[index].link();
            info!(link = %link, "[DECK] Opening active card");
            return Ok(Activation::Open(link));
        }
        self.carousel.go_to(index, now_ms).map(Activation::Moved)
    }

    pub fn placed(&self) -> Vec<PlacedCard<'_>> {
        self.cards
            .iter()
            .zip(self.carousel.transforms())
            .map(|(card, transform)| PlacedCard { card, transform })
            .collect()
    }
}
