//! Carousel engine: the single state machine behind the hero carousel and the card deck.
//!
//! A [`Carousel`] owns the active index, the auto-advance deadline and the current phase.
//! Nothing else mutates them; callers feed it events (`tick`, `grab`, `drag`, `release`,
//! `go_to`, `key`) together with the current time in milliseconds and render whatever
//! [`Carousel::transforms`] returns. Time is always passed in, so the engine is
//! deterministic and has no timers of its own.
//!
//! # Phases
//! - `Idle`: the auto-advance timer may fire.
//! - `Animating`: a step from one index to another is in flight. Further navigation
//!   requests are coalesced into it (the target moves), never queued.
//! - `Interacting`: a drag gesture owns the carousel; the timer is disarmed.

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{CarouselConfig, TransformStyle};

/// Sign of the last navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Backward,
    None,
    Forward,
}

impl Direction {
    pub fn from_delta(delta: i64) -> Self {
        match delta.signum() {
            -1 => Direction::Backward,
            1 => Direction::Forward,
            _ => Direction::None,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Backward => -1,
            Direction::None => 0,
            Direction::Forward => 1,
        }
    }
}

/// Who started an animation; decides how long the timer waits once it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Auto,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Idle,
    Animating {
        from: usize,
        to: usize,
        direction: Direction,
        started_at_ms: u64,
        ends_at_ms: u64,
        origin: Origin,
    },
    Interacting {
        drag_offset: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
}

/// Drag release measurements along the carousel axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gesture {
    pub displacement: f32,
    pub velocity: f32,
}

/// What a single call changed. Render layers use it to pick an animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Nothing changed.
    None,
    Started {
        from: usize,
        to: usize,
        direction: Direction,
    },
    /// An in-flight animation got a new target.
    Retargeted { from: usize, to: usize },
    Settled { index: usize },
    /// A drag began; `cancelled` is true when it interrupted an animation.
    Grabbed { cancelled: bool },
    SnappedBack { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CarouselError {
    #[error("a carousel needs at least one item")]
    Empty,
    #[error("index {index} is out of range for {len} items")]
    OutOfRange { index: usize, len: usize },
}

/// Derived, render-ready placement of one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemTransform {
    pub index: usize,
    pub offset: i64,
    pub x: f32,
    pub scale: f32,
    pub opacity: f32,
    pub z_index: i64,
    pub is_active: bool,
}

/// Signed circular distance from `active` to `index`, in `(-len/2, len/2]`.
pub fn signed_offset(index: usize, active: usize, len: usize) -> i64 {
    if len == 0 {
        return 0;
    }
    let n = len as i64;
    let raw = (index as i64 - active as i64).rem_euclid(n);
    // Offsets past the midpoint wrap to the other side; exactly n/2 stays positive.
    if 2 * raw > n {
        raw - n
    } else {
        raw
    }
}

/// Placement of item `index` when `active` is centred. Pure and side-effect free.
pub fn item_transform(
    index: usize,
    active: usize,
    len: usize,
    style: &TransformStyle,
) -> ItemTransform {
    let offset = signed_offset(index, active, len);
    let distance = offset.unsigned_abs() as f32;
    let is_active = offset == 0;
    let (scale, opacity) = if is_active {
        (style.active_scale, style.active_opacity)
    } else {
        (
            (style.inactive_scale - style.scale_step * (distance - 1.0)).max(style.min_scale),
            (style.inactive_opacity - style.opacity_step * (distance - 1.0)).max(style.min_opacity),
        )
    };
    let n = len as i64;
    ItemTransform {
        index,
        offset,
        x: offset as f32 * style.spacing,
        scale,
        opacity,
        z_index: if is_active { n + 1 } else { n - offset.abs() },
        is_active,
    }
}

pub fn next_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (index + 1) % len
    }
}

pub fn step_index(index: usize, step: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as i64 + step).rem_euclid(len as i64) as usize
}

#[derive(Debug, Clone)]
pub struct Carousel {
    len: usize,
    active: usize,
    direction: Direction,
    phase: Phase,
    next_advance_at_ms: Option<u64>,
    config: CarouselConfig,
}

impl Carousel {
    pub fn new(len: usize, config: CarouselConfig, now_ms: u64) -> Result<Self, CarouselError> {
        if len == 0 {
            return Err(CarouselError::Empty);
        }
        let mut carousel = Carousel {
            len,
            active: 0,
            direction: Direction::None,
            phase: Phase::Idle,
            next_advance_at_ms: None,
            config,
        };
        carousel.arm(now_ms, carousel.config.interval_ms);
        Ok(carousel)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating { .. })
    }

    pub fn is_interacting(&self) -> bool {
        matches!(self.phase, Phase::Interacting { .. })
    }

    /// When the auto-advance timer fires next, if it is armed.
    pub fn next_advance_at(&self) -> Option<u64> {
        self.next_advance_at_ms
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    /// Earliest time at which [`Carousel::tick`] can change something.
    pub fn next_deadline(&self) -> Option<u64> {
        match self.phase {
            Phase::Animating { ends_at_ms, .. } => Some(ends_at_ms),
            Phase::Idle => self.next_advance_at_ms,
            Phase::Interacting { .. } => None,
        }
    }

    fn navigable(&self) -> bool {
        self.len > 1
    }

    fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.next_advance_at_ms = if self.config.auto_advance && self.navigable() {
            Some(now_ms.saturating_add(delay_ms))
        } else {
            None
        };
    }

    fn disarm(&mut self) {
        self.next_advance_at_ms = None;
    }

    fn start(
        &mut self,
        from: usize,
        to: usize,
        direction: Direction,
        origin: Origin,
        now_ms: u64,
    ) -> Transition {
        self.disarm();
        self.direction = direction;
        self.phase = Phase::Animating {
            from,
            to,
            direction,
            started_at_ms: now_ms,
            ends_at_ms: now_ms.saturating_add(self.config.animation_ms),
            origin,
        };
        debug!(from, to, direction = direction.as_i8(), ?origin, "[CAROUSEL] Animation started");
        Transition::Started { from, to, direction }
    }

    /// Advances time. Settles a finished animation, then lets the timer fire if idle.
    pub fn tick(&mut self, now_ms: u64) -> Transition {
        if let Phase::Animating {
            to,
            started_at_ms,
            ends_at_ms,
            origin,
            ..
        } = self.phase
        {
            if now_ms < ends_at_ms {
                return Transition::None;
            }
            self.active = to;
            self.phase = Phase::Idle;
            match origin {
                // Fixed cadence counts the interval from when the step started.
                Origin::Auto if self.config.fixed_cadence => {
                    self.arm(started_at_ms, self.config.interval_ms)
                }
                Origin::Auto => self.arm(now_ms, self.config.interval_ms),
                Origin::User => self.arm(now_ms, self.config.resume_after_ms),
            }
            trace!(index = to, "[CAROUSEL] Animation settled");
            return Transition::Settled { index: to };
        }

        match (self.phase, self.next_advance_at_ms) {
            (Phase::Idle, Some(due)) if now_ms >= due => {
                let to = next_index(self.active, self.len);
                self.start(self.active, to, Direction::Forward, Origin::Auto, now_ms)
            }
            _ => Transition::None,
        }
    }

    /// Pointer or touch down on the carousel. Always wins over the timer and any animation.
    pub fn grab(&mut self, _now_ms: u64) -> Transition {
        self.disarm();
        let cancelled = self.is_animating();
        if let Phase::Animating { from, .. } = self.phase {
            // The step never completed, so the carousel stays where it started.
            self.active = from;
        }
        self.phase = Phase::Interacting { drag_offset: 0.0 };
        debug!(cancelled, "[CAROUSEL] Grabbed");
        Transition::Grabbed { cancelled }
    }

    pub fn drag(&mut self, offset: f32) {
        if let Phase::Interacting { drag_offset } = &mut self.phase {
            *drag_offset = offset;
        }
    }

    /// Current drag offset while interacting, for rendering the carousel under the pointer.
    pub fn drag_offset(&self) -> f32 {
        match self.phase {
            Phase::Interacting { drag_offset } => drag_offset,
            _ => 0.0,
        }
    }

    /// End of a drag. Commits one step when the gesture is long or fast enough.
    pub fn release(&mut self, gesture: Gesture, now_ms: u64) -> Transition {
        if !self.is_interacting() {
            return Transition::None;
        }
        self.phase = Phase::Idle;

        let committed = self.navigable()
            && (gesture.displacement.abs() > self.config.drag_threshold_px
                || gesture.velocity.abs() > self.config.velocity_threshold);
        if !committed {
            self.arm(now_ms, self.config.resume_after_ms);
            debug!(index = self.active, "[CAROUSEL] Drag released below threshold, snapping back");
            return Transition::SnappedBack { index: self.active };
        }

        let sign = if gesture.displacement != 0.0 {
            gesture.displacement.signum()
        } else {
            gesture.velocity.signum()
        };
        let step = if sign < 0.0 { -1 } else { 1 };
        let to = step_index(self.active, step, self.len);
        self.start(self.active, to, Direction::from_delta(step), Origin::User, now_ms)
    }

    /// Direct navigation, e.g. a dot click.
    pub fn go_to(&mut self, target: usize, now_ms: u64) -> Result<Transition, CarouselError> {
        if target >= self.len {
            return Err(CarouselError::OutOfRange {
                index: target,
                len: self.len,
            });
        }
        if !self.navigable() {
            return Ok(Transition::None);
        }
        Ok(self.navigate(target, None, now_ms))
    }

    /// Keyboard navigation; ignored unless enabled for this carousel.
    pub fn key(&mut self, key: Key, now_ms: u64) -> Transition {
        if !self.config.keyboard || !self.navigable() {
            return Transition::None;
        }
        let step = match key {
            Key::Left => -1,
            Key::Right => 1,
        };
        let base = match self.phase {
            Phase::Animating { to, .. } => to,
            _ => self.active,
        };
        self.navigate(
            step_index(base, step, self.len),
            Some(Direction::from_delta(step)),
            now_ms,
        )
    }

    /// One forward step as if requested by the user.
    pub fn advance(&mut self, now_ms: u64) -> Transition {
        if !self.navigable() {
            return Transition::None;
        }
        let base = match self.phase {
            Phase::Animating { to, .. } => to,
            _ => self.active,
        };
        self.navigate(next_index(base, self.len), Some(Direction::Forward), now_ms)
    }

    /// `step` is the direction of a relative request (keyboard, advance); absolute requests
    /// take the sign of `target - current`.
    fn navigate(&mut self, target: usize, step: Option<Direction>, now_ms: u64) -> Transition {
        match self.phase {
            Phase::Animating {
                from,
                started_at_ms,
                ends_at_ms,
                ..
            } => {
                let direction =
                    step.unwrap_or_else(|| Direction::from_delta(target as i64 - from as i64));
                self.direction = direction;
                self.phase = Phase::Animating {
                    from,
                    to: target,
                    direction,
                    started_at_ms,
                    ends_at_ms,
                    origin: Origin::User,
                };
                debug!(from, to = target, "[CAROUSEL] Coalesced navigation into running animation");
                Transition::Retargeted { from, to: target }
            }
            Phase::Idle | Phase::Interacting { .. } => {
                self.phase = Phase::Idle;
                if target == self.active {
                    self.arm(now_ms, self.config.resume_after_ms);
                    return Transition::None;
                }
                let direction = step
                    .unwrap_or_else(|| Direction::from_delta(target as i64 - self.active as i64));
                self.start(self.active, target, direction, Origin::User, now_ms)
            }
        }
    }

    pub fn transform(&self, index: usize) -> ItemTransform {
        item_transform(index, self.active, self.len, &self.config.style)
    }

    pub fn transforms(&self) -> Vec<ItemTransform> {
        (0..self.len).map(|i| self.transform(i)).collect()
    }
}
