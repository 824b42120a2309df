//! Entity templates and the contexts their callbacks run in.

use std::{fmt, time::Duration};

use pounce_core::{ClassTag, Effect, Outcome, SoundRef, SpawnMode, VisualHandle, VisualRef};
use thiserror::Error;
use tracing::debug;

/// Spawn cadence applied when the builder is not given one.
pub const DEFAULT_SPAWN_INTERVAL: Duration = Duration::from_millis(150);

/// Footprint applied when the builder is not given one.
pub const DEFAULT_SIZE_PX: u32 = 30;

/// Callback run when an instance is clicked and during the classification probe.
pub type ClickHandler = Box<dyn Fn(&mut ClickContext<'_>)>;

/// Callback run after a real click to trigger presentation effects.
pub type EffectHandler = Box<dyn Fn(&mut EffectContext<'_>)>;

/// Callback that decides whether a clicked instance leaves the play area.
pub type RemovalHandler = Box<dyn Fn(&mut RemovalContext<'_>) -> Removal>;

/// Errors raised when an entity description is malformed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EntityError {
    /// Every entity needs a non-empty class tag.
    #[error("entity class tag must not be empty")]
    BlankClassTag,
    /// Spawn timers cannot run with a zero period.
    #[error("entity `{class_tag}` has a zero spawn interval")]
    ZeroSpawnInterval {
        /// Entity that failed validation.
        class_tag: ClassTag,
    },
    /// Instances must occupy at least one pixel.
    #[error("entity `{class_tag}` has a zero footprint")]
    ZeroFootprint {
        /// Entity that failed validation.
        class_tag: ClassTag,
    },
    /// Spawn probabilities are restricted to `[0, 1]`.
    #[error("entity `{class_tag}` has spawn probability {probability} outside [0, 1]")]
    InvalidProbability {
        /// Entity that failed validation.
        class_tag: ClassTag,
        /// Rejected probability.
        probability: f64,
    },
}

/// Template describing one kind of collectible or hazard.
///
/// Entities are immutable once built; the points an entity earns during a
/// round are tracked by the session that registered it.
pub struct Entity {
    class_tag: ClassTag,
    visual: VisualRef,
    sound: Option<SoundRef>,
    spawn_interval: Duration,
    spawn_mode: Option<SpawnMode>,
    spawn_probability: f64,
    size_px: u32,
    exclude_from_stats: Option<bool>,
    on_click: Option<ClickHandler>,
    on_effect: Option<EffectHandler>,
    on_remove: Option<RemovalHandler>,
}

impl Entity {
    /// Starts describing an entity with the provided class tag and artwork.
    #[must_use]
    pub fn builder<T>(class_tag: T, visual: VisualRef) -> EntityBuilder
    where
        T: Into<String>,
    {
        EntityBuilder {
            class_tag: ClassTag::new(class_tag),
            visual,
            sound: None,
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            spawn_mode: None,
            spawn_probability: 1.0,
            size_px: DEFAULT_SIZE_PX,
            exclude_from_stats: None,
            on_click: None,
            on_effect: None,
            on_remove: None,
        }
    }

    /// Class tag shared by every instance of the entity.
    #[must_use]
    pub fn class_tag(&self) -> &ClassTag {
        &self.class_tag
    }

    /// Artwork used for spawned instances.
    #[must_use]
    pub fn visual(&self) -> &VisualRef {
        &self.visual
    }

    /// Sound played when an instance is clicked.
    #[must_use]
    pub fn sound(&self) -> Option<&SoundRef> {
        self.sound.as_ref()
    }

    /// Period of the entity's spawn timer.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        self.spawn_interval
    }

    /// Spawn policy, or `None` when the entity never spawns.
    #[must_use]
    pub fn spawn_mode(&self) -> Option<SpawnMode> {
        self.spawn_mode
    }

    /// Probability that a spawn attempt places an instance.
    #[must_use]
    pub fn spawn_probability(&self) -> f64 {
        self.spawn_probability
    }

    /// Footprint of a freshly spawned instance in pixels.
    #[must_use]
    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    /// Explicit statistics visibility, or `None` when it should be inferred.
    #[must_use]
    pub fn exclude_from_stats(&self) -> Option<bool> {
        self.exclude_from_stats
    }

    pub(crate) fn on_click(&self) -> Option<&ClickHandler> {
        self.on_click.as_ref()
    }

    pub(crate) fn on_effect(&self) -> Option<&EffectHandler> {
        self.on_effect.as_ref()
    }

    pub(crate) fn on_remove(&self) -> Option<&RemovalHandler> {
        self.on_remove.as_ref()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("class_tag", &self.class_tag)
            .field("visual", &self.visual)
            .field("sound", &self.sound)
            .field("spawn_interval", &self.spawn_interval)
            .field("spawn_mode", &self.spawn_mode)
            .field("spawn_probability", &self.spawn_probability)
            .field("size_px", &self.size_px)
            .field("exclude_from_stats", &self.exclude_from_stats)
            .field("on_click", &self.on_click.is_some())
            .field("on_effect", &self.on_effect.is_some())
            .field("on_remove", &self.on_remove.is_some())
            .finish()
    }
}

/// Builder validating entity descriptions before they reach a session.
pub struct EntityBuilder {
    class_tag: ClassTag,
    visual: VisualRef,
    sound: Option<SoundRef>,
    spawn_interval: Duration,
    spawn_mode: Option<SpawnMode>,
    spawn_probability: f64,
    size_px: u32,
    exclude_from_stats: Option<bool>,
    on_click: Option<ClickHandler>,
    on_effect: Option<EffectHandler>,
    on_remove: Option<RemovalHandler>,
}

impl EntityBuilder {
    /// Sets the sound played on click.
    #[must_use]
    pub fn sound(mut self, sound: SoundRef) -> Self {
        self.sound = Some(sound);
        self
    }

    /// Sets the period of the spawn timer.
    #[must_use]
    pub fn spawn_every(mut self, interval: Duration) -> Self {
        self.spawn_interval = interval;
        self
    }

    /// Sets the spawn policy. Entities without one never spawn.
    #[must_use]
    pub fn spawn_mode(mut self, mode: SpawnMode) -> Self {
        self.spawn_mode = Some(mode);
        self
    }

    /// Sets the probability that a spawn attempt succeeds.
    #[must_use]
    pub fn spawn_probability(mut self, probability: f64) -> Self {
        self.spawn_probability = probability;
        self
    }

    /// Sets the footprint of spawned instances.
    #[must_use]
    pub fn size_px(mut self, size_px: u32) -> Self {
        self.size_px = size_px;
        self
    }

    /// Overrides the statistics visibility the session would otherwise infer.
    #[must_use]
    pub fn exclude_from_stats(mut self, exclude: bool) -> Self {
        self.exclude_from_stats = Some(exclude);
        self
    }

    /// Installs the click handler.
    ///
    /// The handler also runs once, simulated, when the entity is registered.
    /// Only the score and the entity tally are rolled back after that probe,
    /// so any other change must be guarded by [`ClickContext::is_simulated`].
    #[must_use]
    pub fn on_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut ClickContext<'_>) + 'static,
    {
        self.on_click = Some(Box::new(handler));
        self
    }

    /// Installs the secondary effect handler.
    #[must_use]
    pub fn on_effect<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut EffectContext<'_>) + 'static,
    {
        self.on_effect = Some(Box::new(handler));
        self
    }

    /// Installs a custom removal policy replacing instant removal.
    #[must_use]
    pub fn on_remove<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut RemovalContext<'_>) -> Removal + 'static,
    {
        self.on_remove = Some(Box::new(handler));
        self
    }

    /// Validates the description and produces the entity.
    pub fn build(self) -> Result<Entity, EntityError> {
        if self.class_tag.is_blank() {
            return Err(EntityError::BlankClassTag);
        }
        if self.spawn_interval.is_zero() {
            return Err(EntityError::ZeroSpawnInterval {
                class_tag: self.class_tag,
            });
        }
        if self.size_px == 0 {
            return Err(EntityError::ZeroFootprint {
                class_tag: self.class_tag,
            });
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(EntityError::InvalidProbability {
                class_tag: self.class_tag,
                probability: self.spawn_probability,
            });
        }

        Ok(Entity {
            class_tag: self.class_tag,
            visual: self.visual,
            sound: self.sound,
            spawn_interval: self.spawn_interval,
            spawn_mode: self.spawn_mode,
            spawn_probability: self.spawn_probability,
            size_px: self.size_px,
            exclude_from_stats: self.exclude_from_stats,
            on_click: self.on_click,
            on_effect: self.on_effect,
            on_remove: self.on_remove,
        })
    }
}

/// State a click handler may read and mutate.
pub struct ClickContext<'a> {
    simulated: bool,
    score: &'a mut i64,
    tally: &'a mut i64,
    remaining_secs: &'a mut i64,
    end_request: &'a mut Option<Outcome>,
}

impl<'a> ClickContext<'a> {
    pub(crate) fn new(
        simulated: bool,
        score: &'a mut i64,
        tally: &'a mut i64,
        remaining_secs: &'a mut i64,
        end_request: &'a mut Option<Outcome>,
    ) -> Self {
        Self {
            simulated,
            score,
            tally,
            remaining_secs,
            end_request,
        }
    }

    /// Reports whether this is the registration probe rather than a real click.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Round score before the handler's changes are applied.
    #[must_use]
    pub fn score(&self) -> i64 {
        *self.score
    }

    /// Adds points to the round score.
    pub fn add_score(&mut self, points: i64) {
        *self.score = self.score.saturating_add(points);
    }

    /// Points the entity has contributed so far.
    #[must_use]
    pub fn tally(&self) -> i64 {
        *self.tally
    }

    /// Adds points to the entity's own tally.
    pub fn add_tally(&mut self, points: i64) {
        *self.tally = self.tally.saturating_add(points);
    }

    /// Seconds left on the countdown.
    #[must_use]
    pub fn time_remaining(&self) -> i64 {
        *self.remaining_secs
    }

    /// Extends (or shortens, when negative) the countdown.
    pub fn add_time(&mut self, secs: i64) {
        *self.remaining_secs = self.remaining_secs.saturating_add(secs);
    }

    /// Ends the round once the click finishes. Ignored while simulated.
    pub fn end_game(&mut self, outcome: Outcome) {
        if self.simulated {
            debug!(?outcome, "ignoring end of round requested by probe");
            return;
        }
        *self.end_request = Some(outcome);
    }
}

/// Effects requested by an effect handler.
pub struct EffectContext<'a> {
    simulated: bool,
    requests: &'a mut Vec<(Effect, Duration)>,
}

impl<'a> EffectContext<'a> {
    pub(crate) fn new(simulated: bool, requests: &'a mut Vec<(Effect, Duration)>) -> Self {
        Self {
            simulated,
            requests,
        }
    }

    /// Reports whether this is the registration probe rather than a real click.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Starts an effect that reverts on its own after `duration`.
    pub fn trigger(&mut self, effect: Effect, duration: Duration) {
        self.requests.push((effect, duration));
    }
}

/// Decision returned by a removal handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// Take the instance off the play area.
    Remove,
    /// Leave the instance alive, optionally with a new footprint.
    Keep {
        /// Footprint to apply, if it should change.
        resize_to: Option<u32>,
    },
}

/// State a removal handler may read and mutate.
pub struct RemovalContext<'a> {
    visual: VisualHandle,
    hits: u32,
    size_px: u32,
    score: &'a mut i64,
    tally: &'a mut i64,
}

impl<'a> RemovalContext<'a> {
    pub(crate) fn new(
        visual: VisualHandle,
        hits: u32,
        size_px: u32,
        score: &'a mut i64,
        tally: &'a mut i64,
    ) -> Self {
        Self {
            visual,
            hits,
            size_px,
            score,
            tally,
        }
    }

    /// Visual of the clicked instance.
    #[must_use]
    pub fn visual(&self) -> VisualHandle {
        self.visual
    }

    /// Clicks the instance received, including the current one.
    #[must_use]
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Current footprint of the instance.
    #[must_use]
    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    /// Adds points to the round score.
    pub fn add_score(&mut self, points: i64) {
        *self.score = self.score.saturating_add(points);
    }

    /// Adds points to the entity's own tally.
    pub fn add_tally(&mut self, points: i64) {
        *self.tally = self.tally.saturating_add(points);
    }
}
