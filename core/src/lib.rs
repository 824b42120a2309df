#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Pounce arcade engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative session, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the session executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! changed. Rendering, audio, the score display, persistence and user prompts
//! are reached exclusively through the collaborator traits declared here, so
//! the session never touches a concrete presentation layer.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a round measured in whole seconds when no override is supplied.
pub const DEFAULT_ROUND_SECS: i64 = 10;

/// Cadence of the global countdown timer.
pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

/// Name assigned to players who decline to introduce themselves.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Credits granted per hundred points scored (an exchange rate of 0.56).
pub const CREDITS_PER_HUNDRED_POINTS: i64 = 56;

/// Converts a final round score into the credits it earns.
///
/// Fractional credits are truncated and negative scores earn nothing.
#[must_use]
pub const fn credit_award(score: i64) -> i64 {
    if score <= 0 {
        return 0;
    }
    score.saturating_mul(CREDITS_PER_HUNDRED_POINTS) / 100
}

/// Category identifier shared by every instance of one entity kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassTag(String);

impl ClassTag {
    /// Creates a new class tag from the provided identifier.
    #[must_use]
    pub fn new<T>(tag: T) -> Self
    where
        T: Into<String>,
    {
        Self(tag.into())
    }

    /// Borrows the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the identifier is empty once surrounding whitespace is ignored.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to the artwork a renderer uses for an entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualRef(String);

impl VisualRef {
    /// Creates a new visual reference, typically an asset path.
    #[must_use]
    pub fn new<T>(reference: T) -> Self
    where
        T: Into<String>,
    {
        Self(reference.into())
    }

    /// Borrows the underlying reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a sound the audio collaborator can play.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundRef(String);

impl SoundRef {
    /// Creates a new sound reference, typically an asset path.
    #[must_use]
    pub fn new<T>(reference: T) -> Self
    where
        T: Into<String>,
    {
        Self(reference.into())
    }

    /// Borrows the underlying reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle identifying one visual placed on the play area by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(u64);

impl VisualHandle {
    /// Creates a new handle with the provided identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Location on the play area measured in pixels from its origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset in pixels.
    pub x: f32,
    /// Vertical offset in pixels.
    pub y: f32,
}

impl Position {
    /// Creates a new position from pixel offsets.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rectangle of valid placement coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest permitted horizontal coordinate.
    pub min_x: f32,
    /// Largest permitted horizontal coordinate.
    pub max_x: f32,
    /// Smallest permitted vertical coordinate.
    pub min_y: f32,
    /// Largest permitted vertical coordinate.
    pub max_y: f32,
}

impl Bounds {
    /// Creates bounds from explicit extremes.
    #[must_use]
    pub const fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Shrinks a container rectangle by `margin` pixels on every side.
    ///
    /// Containers smaller than twice the margin collapse onto their centre line
    /// instead of producing inverted bounds.
    #[must_use]
    pub fn inset(container: Self, margin: f32) -> Self {
        let (min_x, max_x) = inset_axis(container.min_x, container.max_x, margin);
        let (min_y, max_y) = inset_axis(container.min_y, container.max_y, margin);
        Self::new(min_x, max_x, min_y, max_y)
    }

    /// Horizontal extent of the bounds.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Vertical extent of the bounds.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Reports whether the position lies within the bounds, edges included.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
    }
}

fn inset_axis(min: f32, max: f32, margin: f32) -> (f32, f32) {
    let inner_min = min + margin;
    let inner_max = max - margin;
    if inner_min <= inner_max {
        (inner_min, inner_max)
    } else {
        let centre = (min + max) / 2.0;
        (centre, centre)
    }
}

/// Policy applied by an entity's spawn timer on every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Spawn only while no instance of the entity is present.
    Exclusive,
    /// Remove any present instance and spawn a fresh one on every tick.
    Replacing,
}

impl FromStr for SpawnMode {
    type Err = UnknownSpawnMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exclusive" | "static" => Ok(Self::Exclusive),
            "replacing" | "continuous" => Ok(Self::Replacing),
            _ => Err(UnknownSpawnMode(value.to_owned())),
        }
    }
}

/// Error produced when a spawn mode name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown spawn mode `{0}`")]
pub struct UnknownSpawnMode(pub String);

/// Result of a finished round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The player outlasted the countdown.
    Win,
    /// The player clicked a hazard.
    Lose,
}

/// Transient presentation effect applied to the play area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Shakes the play area until reverted.
    Shake,
}

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Begins the round: resets counters and starts every timer.
    StartRound,
    /// Advances the session clock by the provided delta time.
    Tick {
        /// Duration of time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Activates the live instance represented by the visual.
    Click {
        /// Visual the player selected.
        visual: VisualHandle,
    },
    /// Terminates the round with the provided outcome.
    EndRound {
        /// Outcome recorded for the round.
        outcome: Outcome,
    },
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Announces that the round began.
    RoundStarted {
        /// Seconds available to the player.
        remaining_secs: i64,
    },
    /// Confirms that an instance of an entity was placed.
    EntitySpawned {
        /// Entity the instance belongs to.
        class_tag: ClassTag,
        /// Visual assigned by the renderer.
        visual: VisualHandle,
        /// Placement chosen for the instance.
        position: Position,
    },
    /// Confirms that an instance left the play area.
    EntityRemoved {
        /// Entity the instance belonged to.
        class_tag: ClassTag,
        /// Visual that was removed.
        visual: VisualHandle,
    },
    /// Reports that a surviving instance changed footprint.
    EntityResized {
        /// Entity the instance belongs to.
        class_tag: ClassTag,
        /// Visual that was resized.
        visual: VisualHandle,
        /// New footprint in pixels.
        size_px: u32,
    },
    /// Reports the running score after it changed.
    ScoreChanged {
        /// Score accumulated during the round.
        score: i64,
    },
    /// Reports the remaining time after it changed.
    TimeChanged {
        /// Seconds left on the countdown.
        remaining_secs: i64,
    },
    /// Reports that a presentation effect started.
    EffectStarted {
        /// Effect that became active.
        effect: Effect,
    },
    /// Reports that a presentation effect reverted.
    EffectEnded {
        /// Effect that ended.
        effect: Effect,
    },
    /// Announces the end of the round along with its report.
    RoundEnded {
        /// Aggregated results of the round.
        summary: RoundSummary,
    },
    /// Announces that the round was torn down because of a configuration error.
    RoundAborted {
        /// Entity whose configuration forced the abort.
        class_tag: ClassTag,
    },
}

/// Points contributed by a single entity during the round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    /// Entity the line describes.
    pub class_tag: ClassTag,
    /// Points accumulated by the entity.
    pub score: i64,
}

/// Aggregated report produced when a round ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Outcome of the round.
    pub outcome: Outcome,
    /// Name of the player who played the round.
    pub player_name: String,
    /// Final round score.
    pub score: i64,
    /// Seconds that were left on the countdown.
    pub remaining_secs: i64,
    /// Per-entity breakdown, limited to entities tracked in statistics.
    pub breakdown: Vec<StatLine>,
    /// Credits earned by this round.
    pub credits_awarded: i64,
    /// Credit balance after the award.
    pub credits_total: i64,
    /// Indicates whether the score beat the previously recorded best.
    pub new_high_score: bool,
}

impl RoundSummary {
    /// Headline shown to the player when the round ends.
    #[must_use]
    pub fn headline(&self) -> String {
        match self.outcome {
            Outcome::Win => format!(
                "Congratulations, {}! You scored {} points!",
                self.player_name, self.score
            ),
            Outcome::Lose => format!(
                "Game over, {}. You scored {} points.",
                self.player_name, self.score
            ),
        }
    }
}

/// Player state persisted between rounds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    /// Best score recorded so far.
    #[serde(default)]
    pub score: Option<i64>,
    /// Name the player last played under.
    #[serde(default)]
    pub name: Option<String>,
    /// Credit balance.
    #[serde(default)]
    pub credits: Option<i64>,
}

/// Renderer collaborator that owns every visual on the play area.
pub trait Renderer {
    /// Places a new visual for the entity at the provided position.
    fn place(
        &mut self,
        appearance: &VisualRef,
        class_tag: &ClassTag,
        size_px: u32,
        position: Position,
    ) -> VisualHandle;

    /// Removes a visual from the play area.
    fn remove(&mut self, visual: VisualHandle);

    /// Changes the footprint of a visual.
    fn resize(&mut self, visual: VisualHandle, size_px: u32);

    /// Reports the play area inset by `margin_px` on every side.
    fn bounds(&self, margin_px: u32) -> Bounds;

    /// Removes every visual from the play area.
    fn clear(&mut self);

    /// Starts a transient effect.
    fn start_effect(&mut self, effect: Effect);

    /// Reverts a transient effect.
    fn stop_effect(&mut self, effect: Effect);
}

/// Audio collaborator. Playback is best effort.
pub trait Audio {
    /// Plays a one-shot sound.
    fn play(&mut self, sound: &SoundRef) -> Result<(), AudioError>;

    /// Starts a looping background track.
    fn play_music(&mut self, track: &SoundRef) -> Result<(), AudioError>;
}

/// Failure reported by an audio collaborator.
#[derive(Debug, Error)]
#[error("failed to play {sound}: {reason}")]
pub struct AudioError {
    /// Sound that could not be played.
    pub sound: SoundRef,
    /// Collaborator-specific explanation.
    pub reason: String,
}

/// Display collaborator that presents textual game state.
pub trait Scoreboard {
    /// Shows the current score.
    fn set_score(&mut self, score: i64);

    /// Shows the remaining time.
    fn set_time(&mut self, remaining_secs: i64);

    /// Shows the best recorded score.
    fn set_high_score(&mut self, score: i64);

    /// Shows the credit balance.
    fn set_credits(&mut self, credits: i64);

    /// Presents the end-of-round report.
    fn present_summary(&mut self, summary: &RoundSummary);

    /// Tells the player they beat their best score.
    fn announce_high_score(&mut self, score: i64);

    /// Surfaces an unrecoverable error that forced the round to reset.
    fn report_fatal(&mut self, message: &str);
}

/// Persistence collaborator storing player state between rounds.
pub trait Persistence {
    /// Loads the stored session, yielding defaults when nothing was saved.
    fn load_session(&mut self) -> Result<SavedSession, PersistenceError>;

    /// Stores the session, replacing any previous contents.
    fn save_session(&mut self, session: &SavedSession) -> Result<(), PersistenceError>;
}

/// Failure reported by a persistence collaborator.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store could not be reached.
    #[error("session storage unavailable: {0}")]
    Unavailable(String),
    /// The stored contents could not be interpreted.
    #[error("stored session is malformed: {0}")]
    Malformed(String),
}

/// User prompt collaborator.
pub trait Prompter {
    /// Asks for free-form text. `None` means the player dismissed the prompt.
    fn ask_text(&mut self, prompt: &str) -> Option<String>;

    /// Asks a yes/no question, re-asking until a valid answer is given.
    fn ask_yes_no(&mut self, prompt: &str) -> bool;
}
