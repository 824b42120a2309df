#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative round state for Pounce.
//!
//! A [`Session`] owns the registered entities, the score, the countdown and
//! every timer of one round. Adapters mutate it through [`Session::register`]
//! and [`apply`], observe it through the [`query`] module, and receive the
//! [`Event`] values each command produced.

pub mod entity;
mod player;
mod report;

use std::{collections::HashMap, time::Duration};

use pounce_core::{
    Audio, ClassTag, Command, Effect, Event, Outcome, Persistence, Renderer, RoundSummary,
    SavedSession, Scoreboard, SoundRef, VisualHandle, COUNTDOWN_INTERVAL, DEFAULT_PLAYER_NAME,
    DEFAULT_ROUND_SECS,
};
use pounce_system_spawning::{Config as SpawnConfig, Spawning};
use pounce_system_timers::{TaskId, TimerError, Timers};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use entity::{
    ClickContext, EffectContext, Entity, EntityBuilder, EntityError, Removal, RemovalContext,
};
pub use player::resolve_player_name;

/// Tunable parameters of a round.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    player_name: String,
    round_secs: i64,
    countdown_interval: Duration,
    rng_seed: u64,
    music: Option<SoundRef>,
}

impl SessionConfig {
    /// Creates a configuration with the default round length for the named player.
    #[must_use]
    pub fn new<T>(player_name: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            player_name: player_name.into(),
            round_secs: DEFAULT_ROUND_SECS,
            countdown_interval: COUNTDOWN_INTERVAL,
            rng_seed: 0,
            music: None,
        }
    }

    /// Sets the number of seconds a round lasts.
    #[must_use]
    pub fn with_round_secs(mut self, round_secs: i64) -> Self {
        self.round_secs = round_secs;
        self
    }

    /// Sets the period of the countdown timer.
    #[must_use]
    pub fn with_countdown_interval(mut self, interval: Duration) -> Self {
        self.countdown_interval = interval;
        self
    }

    /// Seeds the random stream used for spawning.
    #[must_use]
    pub fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    /// Sets the looping track started with the round.
    #[must_use]
    pub fn with_music(mut self, track: SoundRef) -> Self {
        self.music = Some(track);
        self
    }

    /// Name the round is played under.
    #[must_use]
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Number of seconds a round lasts.
    #[must_use]
    pub fn round_secs(&self) -> i64 {
        self.round_secs
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER_NAME)
    }
}

/// Hook invoked once when a round ends, typically to switch screens.
pub type RoundCompleteHook = Box<dyn FnMut(&RoundSummary)>;

/// External collaborators a session drives.
pub struct Collaborators {
    renderer: Box<dyn Renderer>,
    audio: Box<dyn Audio>,
    scoreboard: Box<dyn Scoreboard>,
    persistence: Box<dyn Persistence>,
    on_round_complete: Option<RoundCompleteHook>,
}

impl Collaborators {
    /// Bundles the collaborators required by a session.
    #[must_use]
    pub fn new(
        renderer: Box<dyn Renderer>,
        audio: Box<dyn Audio>,
        scoreboard: Box<dyn Scoreboard>,
        persistence: Box<dyn Persistence>,
    ) -> Self {
        Self {
            renderer,
            audio,
            scoreboard,
            persistence,
            on_round_complete: None,
        }
    }

    /// Installs the round-complete hook.
    #[must_use]
    pub fn on_round_complete<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&RoundSummary) + 'static,
    {
        self.on_round_complete = Some(Box::new(hook));
        self
    }
}

/// Errors raised while driving a round.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Class tags identify live instances and must be unique.
    #[error("an entity tagged `{class_tag}` is already registered")]
    DuplicateClassTag {
        /// Tag that collided.
        class_tag: ClassTag,
    },
    /// The round already started.
    #[error("the round is already running")]
    AlreadyRunning,
    /// The round ended or was aborted; a new session is required.
    #[error("the round is over; start a new session")]
    RoundOver,
    /// A clicked instance belongs to an entity without a click handler.
    #[error("entity `{class_tag}` has no click handler; the round must restart")]
    MissingClickHandler {
        /// Entity that lacks the handler.
        class_tag: ClassTag,
    },
    /// A timer could not be scheduled.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Lifecycle stage of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Entities may be registered; no timer runs yet.
    Ready,
    /// Timers are running and clicks are accepted.
    Running,
    /// The round finished normally.
    Ended,
    /// The round was torn down by a configuration error.
    Aborted,
}

/// State of the instance currently alive for an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveInstance {
    /// Visual assigned by the renderer.
    pub visual: VisualHandle,
    /// Current footprint in pixels.
    pub size_px: u32,
    /// Clicks received since the instance spawned.
    pub hits: u32,
}

#[derive(Debug)]
pub(crate) struct RosterEntry {
    pub(crate) entity: Entity,
    pub(crate) tally: i64,
    pub(crate) exclude_from_stats: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    Spawn(usize),
    Countdown,
    RevertEffect(Effect),
}

/// Represents one round of play.
pub struct Session {
    config: SessionConfig,
    phase: Phase,
    roster: Vec<RosterEntry>,
    live: HashMap<ClassTag, LiveInstance>,
    effects: HashMap<Effect, TaskId>,
    score: i64,
    remaining_secs: i64,
    timers: Timers<Task>,
    spawning: Spawning,
    collaborators: Collaborators,
    last_summary: Option<RoundSummary>,
}

impl Session {
    /// Creates a session ready to accept entities.
    #[must_use]
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        Self {
            spawning: Spawning::new(SpawnConfig::new(config.rng_seed)),
            remaining_secs: config.round_secs,
            config,
            phase: Phase::Ready,
            roster: Vec::new(),
            live: HashMap::new(),
            effects: HashMap::new(),
            score: 0,
            timers: Timers::new(),
            collaborators,
            last_summary: None,
        }
    }

    /// Adds an entity to the roster after classifying it with a simulated click.
    ///
    /// The probe runs the click handler once with no visual. Unless the entity
    /// states its statistics visibility explicitly, it is hidden from the
    /// end-of-round breakdown when the probe changed neither the round score
    /// nor the entity tally. Both values are restored afterwards. Entities
    /// registered while the round runs start spawning immediately.
    pub fn register(&mut self, entity: Entity) -> Result<(), SessionError> {
        if matches!(self.phase, Phase::Ended | Phase::Aborted) {
            return Err(SessionError::RoundOver);
        }
        if self
            .roster
            .iter()
            .any(|entry| entry.entity.class_tag() == entity.class_tag())
        {
            return Err(SessionError::DuplicateClassTag {
                class_tag: entity.class_tag().clone(),
            });
        }

        let affects_score = self.probe(&entity);
        let exclude_from_stats = entity.exclude_from_stats().unwrap_or(!affects_score);
        info!(
            class_tag = %entity.class_tag(),
            affects_score,
            exclude_from_stats,
            "entity registered"
        );

        self.roster.push(RosterEntry {
            entity,
            tally: 0,
            exclude_from_stats,
        });

        if self.phase == Phase::Running {
            self.schedule_spawns(self.roster.len() - 1)?;
        }
        Ok(())
    }

    fn probe(&mut self, entity: &Entity) -> bool {
        let Some(on_click) = entity.on_click() else {
            warn!(class_tag = %entity.class_tag(), "entity has no click handler");
            return false;
        };

        let score_before = self.score;
        let mut tally = 0;
        let mut end_request = None;
        let mut context = ClickContext::new(
            true,
            &mut self.score,
            &mut tally,
            &mut self.remaining_secs,
            &mut end_request,
        );
        on_click(&mut context);

        let affects_score = self.score != score_before || tally != 0;
        self.score = score_before;
        affects_score
    }

    fn start_round(&mut self, out: &mut Vec<Event>) -> Result<(), SessionError> {
        match self.phase {
            Phase::Ready => {}
            Phase::Running => return Err(SessionError::AlreadyRunning),
            Phase::Ended | Phase::Aborted => return Err(SessionError::RoundOver),
        }

        let _ = self
            .timers
            .schedule_repeating(self.config.countdown_interval, Task::Countdown)?;
        for index in 0..self.roster.len() {
            self.schedule_spawns(index)?;
        }

        self.phase = Phase::Running;
        self.score = 0;
        self.remaining_secs = self.config.round_secs;
        self.live.clear();
        self.collaborators.renderer.clear();

        let saved = self.load_saved();
        let scoreboard = &mut self.collaborators.scoreboard;
        scoreboard.set_score(self.score);
        scoreboard.set_time(self.remaining_secs);
        scoreboard.set_high_score(saved.score.unwrap_or(0));
        scoreboard.set_credits(saved.credits.unwrap_or(0));

        if let Some(track) = &self.config.music {
            if let Err(error) = self.collaborators.audio.play_music(track) {
                debug!(%error, "background music unavailable");
            }
        }

        info!(
            player = %self.config.player_name,
            entities = self.roster.len(),
            remaining_secs = self.remaining_secs,
            "round started"
        );
        out.push(Event::RoundStarted {
            remaining_secs: self.remaining_secs,
        });
        Ok(())
    }

    fn schedule_spawns(&mut self, index: usize) -> Result<(), SessionError> {
        let entity = &self.roster[index].entity;
        if entity.spawn_mode().is_none() {
            warn!(
                class_tag = %entity.class_tag(),
                "entity has no known spawn mode and will never spawn"
            );
            return Ok(());
        }
        let _ = self
            .timers
            .schedule_repeating(entity.spawn_interval(), Task::Spawn(index))?;
        Ok(())
    }

    fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        if self.phase != Phase::Running {
            debug!(phase = ?self.phase, "ignoring tick outside a running round");
            return;
        }

        self.timers.advance(dt);
        while let Some(fired) = self.timers.next_due() {
            match fired.payload {
                Task::Spawn(index) => self.spawn_tick(index, out),
                Task::Countdown => self.countdown_tick(out),
                Task::RevertEffect(effect) => {
                    let _ = self.effects.remove(&effect);
                    self.collaborators.renderer.stop_effect(effect);
                    out.push(Event::EffectEnded { effect });
                }
            }
        }
    }

    fn spawn_tick(&mut self, index: usize, out: &mut Vec<Event>) {
        let entity = &self.roster[index].entity;
        let Some(mode) = entity.spawn_mode() else {
            return;
        };
        let class_tag = entity.class_tag();
        let live = self.live.get(class_tag).map(|instance| instance.visual);
        let bounds = self.collaborators.renderer.bounds(entity.size_px());
        let plan = self
            .spawning
            .plan(mode, live, entity.spawn_probability(), bounds);

        if let Some(visual) = plan.remove {
            self.collaborators.renderer.remove(visual);
            let _ = self.live.remove(class_tag);
            out.push(Event::EntityRemoved {
                class_tag: class_tag.clone(),
                visual,
            });
        }

        if let Some(position) = plan.place {
            let visual = self.collaborators.renderer.place(
                entity.visual(),
                class_tag,
                entity.size_px(),
                position,
            );
            debug!(%class_tag, visual = visual.get(), x = position.x, y = position.y, "spawned");
            let _ = self.live.insert(
                class_tag.clone(),
                LiveInstance {
                    visual,
                    size_px: entity.size_px(),
                    hits: 0,
                },
            );
            out.push(Event::EntitySpawned {
                class_tag: class_tag.clone(),
                visual,
                position,
            });
        }
    }

    fn countdown_tick(&mut self, out: &mut Vec<Event>) {
        self.remaining_secs -= 1;
        self.collaborators.scoreboard.set_time(self.remaining_secs);
        out.push(Event::TimeChanged {
            remaining_secs: self.remaining_secs,
        });

        if self.remaining_secs <= 0 {
            self.end_round(Outcome::Win, out);
        }
    }

    fn click(&mut self, visual: VisualHandle, out: &mut Vec<Event>) -> Result<(), SessionError> {
        if self.phase != Phase::Running {
            debug!(visual = visual.get(), phase = ?self.phase, "ignoring click outside a running round");
            return Ok(());
        }

        let Some(index) = self.live_entity_index(visual) else {
            debug!(visual = visual.get(), "ignoring click on a stale visual");
            return Ok(());
        };
        let class_tag = self.roster[index].entity.class_tag().clone();
        let hits = match self.live.get_mut(&class_tag) {
            Some(instance) => {
                instance.hits += 1;
                instance.hits
            }
            None => 1,
        };

        let score_before = self.score;
        let time_before = self.remaining_secs;
        let mut end_request = None;
        {
            let entry = &mut self.roster[index];
            let Some(on_click) = entry.entity.on_click() else {
                return Err(self.abort(class_tag, out));
            };
            let mut context = ClickContext::new(
                false,
                &mut self.score,
                &mut entry.tally,
                &mut self.remaining_secs,
                &mut end_request,
            );
            on_click(&mut context);

            if let Some(sound) = entry.entity.sound() {
                if let Err(error) = self.collaborators.audio.play(sound) {
                    debug!(%error, "click sound failed");
                }
            }
        }
        debug!(%class_tag, hits, score = self.score, "clicked");

        if let Some(outcome) = end_request {
            self.end_round(outcome, out);
            return Ok(());
        }

        self.run_effects(index, out);
        if self.score != score_before {
            self.publish_score(out);
        } else {
            self.collaborators.scoreboard.set_score(self.score);
        }
        if self.remaining_secs != time_before {
            self.collaborators.scoreboard.set_time(self.remaining_secs);
            out.push(Event::TimeChanged {
                remaining_secs: self.remaining_secs,
            });
        }

        self.resolve_removal(index, visual, hits, out);
        Ok(())
    }

    fn live_entity_index(&self, visual: VisualHandle) -> Option<usize> {
        let (class_tag, _) = self
            .live
            .iter()
            .find(|(_, instance)| instance.visual == visual)?;
        self.roster
            .iter()
            .position(|entry| entry.entity.class_tag() == class_tag)
    }

    fn run_effects(&mut self, index: usize, out: &mut Vec<Event>) {
        let Some(on_effect) = self.roster[index].entity.on_effect() else {
            return;
        };
        let mut requests = Vec::new();
        on_effect(&mut EffectContext::new(false, &mut requests));

        for (effect, duration) in requests {
            if let Some(previous) = self.effects.remove(&effect) {
                let _ = self.timers.cancel(previous);
            }
            let revert = self
                .timers
                .schedule_once(duration, Task::RevertEffect(effect));
            let _ = self.effects.insert(effect, revert);
            self.collaborators.renderer.start_effect(effect);
            out.push(Event::EffectStarted { effect });
        }
    }

    fn resolve_removal(
        &mut self,
        index: usize,
        visual: VisualHandle,
        hits: u32,
        out: &mut Vec<Event>,
    ) {
        let entry = &mut self.roster[index];
        let class_tag = entry.entity.class_tag().clone();
        let score_before = self.score;
        let decision = match entry.entity.on_remove() {
            None => Removal::Remove,
            Some(on_remove) => {
                let size_px = self
                    .live
                    .get(&class_tag)
                    .map_or(entry.entity.size_px(), |instance| instance.size_px);
                on_remove(&mut RemovalContext::new(
                    visual,
                    hits,
                    size_px,
                    &mut self.score,
                    &mut entry.tally,
                ))
            }
        };
        if self.score != score_before {
            self.publish_score(out);
        }

        match decision {
            Removal::Remove => {
                self.collaborators.renderer.remove(visual);
                let _ = self.live.remove(&class_tag);
                out.push(Event::EntityRemoved { class_tag, visual });
            }
            Removal::Keep { resize_to: None } => {}
            Removal::Keep {
                resize_to: Some(size_px),
            } => {
                self.collaborators.renderer.resize(visual, size_px);
                if let Some(instance) = self.live.get_mut(&class_tag) {
                    instance.size_px = size_px;
                }
                out.push(Event::EntityResized {
                    class_tag,
                    visual,
                    size_px,
                });
            }
        }
    }

    fn publish_score(&mut self, out: &mut Vec<Event>) {
        self.collaborators.scoreboard.set_score(self.score);
        out.push(Event::ScoreChanged { score: self.score });
    }

    fn end_round(&mut self, outcome: Outcome, out: &mut Vec<Event>) {
        if self.phase != Phase::Running {
            debug!(?outcome, phase = ?self.phase, "round already over");
            return;
        }

        let cancelled = self.timers.cancel_all();
        self.phase = Phase::Ended;
        self.stop_effects();

        let previous = self.load_saved();
        let (summary, saved) = report::settle(
            outcome,
            &self.config.player_name,
            self.score,
            self.remaining_secs,
            report::breakdown(&self.roster),
            &previous,
        );

        self.live.clear();
        self.collaborators.renderer.clear();
        self.collaborators.scoreboard.present_summary(&summary);

        if let Err(error) = self.collaborators.persistence.save_session(&saved) {
            warn!(%error, "failed to persist round results");
        }
        if summary.new_high_score {
            self.collaborators
                .scoreboard
                .announce_high_score(summary.score);
            self.collaborators.scoreboard.set_high_score(summary.score);
        }
        self.collaborators
            .scoreboard
            .set_credits(summary.credits_total);

        if let Some(hook) = self.collaborators.on_round_complete.as_mut() {
            hook(&summary);
        }

        info!(
            ?outcome,
            score = summary.score,
            credits_awarded = summary.credits_awarded,
            cancelled_timers = cancelled,
            "round ended"
        );
        self.remaining_secs = self.config.round_secs;
        self.last_summary = Some(summary.clone());
        out.push(Event::RoundEnded { summary });
    }

    fn abort(&mut self, class_tag: ClassTag, out: &mut Vec<Event>) -> SessionError {
        let error = SessionError::MissingClickHandler {
            class_tag: class_tag.clone(),
        };
        let _ = self.timers.cancel_all();
        self.phase = Phase::Aborted;
        self.stop_effects();
        self.live.clear();
        self.collaborators.renderer.clear();
        self.collaborators
            .scoreboard
            .report_fatal(&error.to_string());
        error!(%class_tag, "round aborted");
        out.push(Event::RoundAborted { class_tag });
        error
    }

    fn stop_effects(&mut self) {
        for (effect, _) in self.effects.drain() {
            self.collaborators.renderer.stop_effect(effect);
        }
    }

    fn load_saved(&mut self) -> SavedSession {
        match self.collaborators.persistence.load_session() {
            Ok(saved) => saved,
            Err(error) => {
                warn!(%error, "failed to load saved session");
                SavedSession::default()
            }
        }
    }
}

/// Applies the provided command to the session, broadcasting resulting events.
pub fn apply(
    session: &mut Session,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), SessionError> {
    match command {
        Command::StartRound => session.start_round(out_events),
        Command::Tick { dt } => {
            session.tick(dt, out_events);
            Ok(())
        }
        Command::Click { visual } => session.click(visual, out_events),
        Command::EndRound { outcome } => {
            session.end_round(outcome, out_events);
            Ok(())
        }
    }
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use std::time::Duration;

    use pounce_core::{ClassTag, RoundSummary};

    use super::{LiveInstance, Phase, Session};

    /// Lifecycle stage of the session.
    #[must_use]
    pub fn phase(session: &Session) -> Phase {
        session.phase
    }

    /// Score accumulated during the round.
    #[must_use]
    pub fn score(session: &Session) -> i64 {
        session.score
    }

    /// Seconds left on the countdown.
    #[must_use]
    pub fn time_remaining(session: &Session) -> i64 {
        session.remaining_secs
    }

    /// Reading of the session clock.
    #[must_use]
    pub fn clock(session: &Session) -> Duration {
        session.timers.now()
    }

    /// Number of timers that may still fire.
    #[must_use]
    pub fn pending_timers(session: &Session) -> usize {
        session.timers.pending()
    }

    /// Class tags of the registered entities in registration order.
    #[must_use]
    pub fn roster(session: &Session) -> Vec<&ClassTag> {
        session
            .roster
            .iter()
            .map(|entry| entry.entity.class_tag())
            .collect()
    }

    /// Instance currently alive for the entity, if any.
    #[must_use]
    pub fn live_instance(session: &Session, class_tag: &ClassTag) -> Option<LiveInstance> {
        session.live.get(class_tag).copied()
    }

    /// Every live instance ordered by class tag.
    #[must_use]
    pub fn live_instances(session: &Session) -> Vec<(ClassTag, LiveInstance)> {
        let mut instances: Vec<_> = session
            .live
            .iter()
            .map(|(tag, instance)| (tag.clone(), *instance))
            .collect();
        instances.sort_by(|left, right| left.0.cmp(&right.0));
        instances
    }

    /// Points the entity contributed during the round.
    #[must_use]
    pub fn tally(session: &Session, class_tag: &ClassTag) -> Option<i64> {
        session
            .roster
            .iter()
            .find(|entry| entry.entity.class_tag() == class_tag)
            .map(|entry| entry.tally)
    }

    /// Whether the entity is hidden from the end-of-round breakdown.
    #[must_use]
    pub fn excluded_from_stats(session: &Session, class_tag: &ClassTag) -> Option<bool> {
        session
            .roster
            .iter()
            .find(|entry| entry.entity.class_tag() == class_tag)
            .map(|entry| entry.exclude_from_stats)
    }

    /// Report produced by the most recent end of round.
    #[must_use]
    pub fn last_summary(session: &Session) -> Option<&RoundSummary> {
        session.last_summary.as_ref()
    }
}
