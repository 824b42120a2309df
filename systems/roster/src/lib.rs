#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reference entity lineup for Pounce.
//!
//! Each [`Variant`] is an ordinary [`Entity`] assembled from the session's
//! click, effect and removal hooks. Adapters build the lineup with
//! [`lineup`], optionally overriding spawn parameters through [`Tuning`].

use std::{collections::BTreeMap, time::Duration};

use pounce_core::{Effect, Outcome, SoundRef, SpawnMode, VisualRef};
use pounce_session::{Entity, EntityError, Removal, Session, SessionError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Points awarded by the bonus fish on top of its shake.
pub const FISH_BONUS: i64 = 5;
/// Duration of the shake triggered by the bonus fish.
pub const SHAKE_DURATION: Duration = Duration::from_millis(500);
/// Seconds added to the countdown by the clock.
pub const CLOCK_BONUS_SECS: i64 = 2;
/// Clicks required to defeat the boss.
pub const BOSS_HITS: u32 = 5;
/// Lump bonus awarded when the boss is defeated.
pub const BOSS_BONUS: i64 = 10;
/// Pixels the boss grows by after every click that does not defeat it.
pub const BOSS_GROWTH_PX: u32 = 10;

/// Entity variants shipped with the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    /// Standard scorer worth one point per click.
    Cat,
    /// Hazard that loses the round when clicked.
    Dog,
    /// Rare bonus that shakes the play area.
    Fish,
    /// Extends the countdown.
    Clock,
    /// Takes several clicks to defeat and pays a lump bonus.
    Boss,
}

impl Variant {
    /// Every variant in lineup order.
    pub const ALL: [Self; 5] = [Self::Cat, Self::Dog, Self::Fish, Self::Clock, Self::Boss];

    /// Class tag the variant registers under.
    #[must_use]
    pub const fn class_tag(self) -> &'static str {
        match self {
            Self::Cat => "cat",
            Self::Dog => "dog",
            Self::Fish => "fish",
            Self::Clock => "clock",
            Self::Boss => "boss",
        }
    }

    /// Finds the variant registered under `class_tag`.
    #[must_use]
    pub fn from_class_tag(class_tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.class_tag() == class_tag)
    }

    const fn defaults(self) -> Defaults {
        match self {
            Self::Cat => Defaults {
                visual: "img/dot.png",
                sound: Some("audio/meow-1.mp3"),
                every_ms: 150,
                mode: SpawnMode::Exclusive,
                probability: 1.0,
                size_px: 30,
            },
            Self::Dog => Defaults {
                visual: "img/bdot.png",
                sound: None,
                every_ms: 450,
                mode: SpawnMode::Replacing,
                probability: 1.0,
                size_px: 30,
            },
            Self::Fish => Defaults {
                visual: "img/fish.png",
                sound: Some("audio/splash.mp3"),
                every_ms: 750,
                mode: SpawnMode::Replacing,
                probability: 0.35,
                size_px: 30,
            },
            Self::Clock => Defaults {
                visual: "img/clock.png",
                sound: Some("audio/tick.mp3"),
                every_ms: 2_000,
                mode: SpawnMode::Exclusive,
                probability: 0.5,
                size_px: 30,
            },
            Self::Boss => Defaults {
                visual: "img/boss.png",
                sound: Some("audio/meow-1.mp3"),
                every_ms: 3_000,
                mode: SpawnMode::Exclusive,
                probability: 1.0,
                size_px: 40,
            },
        }
    }
}

struct Defaults {
    visual: &'static str,
    sound: Option<&'static str>,
    every_ms: u64,
    mode: SpawnMode,
    probability: f64,
    size_px: u32,
}

/// Per-entity overrides of the spawn parameters.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Spawn interval in milliseconds.
    pub spawn_every_ms: Option<u64>,
    /// Probability that a spawn attempt succeeds.
    pub spawn_probability: Option<f64>,
    /// Spawn mode name, `exclusive`/`static` or `replacing`/`continuous`.
    pub spawn_mode: Option<String>,
}

/// Errors raised while assembling the lineup.
#[derive(Debug, Error)]
pub enum RosterError {
    /// A tuning entry names no known variant.
    #[error("no entity is tagged `{0}`")]
    UnknownEntity(String),
    /// A tuned variant failed validation.
    #[error(transparent)]
    Entity(#[from] EntityError),
    /// The session rejected a variant.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Builds a single variant with the provided overrides applied.
pub fn entity(variant: Variant, tuning: &Tuning) -> Result<Entity, EntityError> {
    let defaults = variant.defaults();
    let every = tuning.spawn_every_ms.unwrap_or(defaults.every_ms);
    let probability = tuning.spawn_probability.unwrap_or(defaults.probability);

    let mut builder = Entity::builder(variant.class_tag(), VisualRef::new(defaults.visual))
        .spawn_every(Duration::from_millis(every))
        .spawn_probability(probability)
        .size_px(defaults.size_px);
    if let Some(sound) = defaults.sound {
        builder = builder.sound(SoundRef::new(sound));
    }

    match tuning.spawn_mode.as_deref() {
        None => builder = builder.spawn_mode(defaults.mode),
        Some(name) => match name.parse::<SpawnMode>() {
            Ok(mode) => builder = builder.spawn_mode(mode),
            Err(error) => warn!(
                class_tag = variant.class_tag(),
                %error,
                "spawn mode not recognised; entity will never spawn"
            ),
        },
    }

    let builder = match variant {
        Variant::Cat => builder.on_click(|context| {
            context.add_score(1);
            context.add_tally(1);
        }),
        Variant::Dog => builder.on_click(|context| context.end_game(Outcome::Lose)),
        Variant::Fish => builder
            .on_click(|context| {
                context.add_score(FISH_BONUS);
                context.add_tally(FISH_BONUS);
            })
            .on_effect(|context| context.trigger(Effect::Shake, SHAKE_DURATION)),
        Variant::Clock => builder.on_click(|context| {
            if !context.is_simulated() {
                context.add_time(CLOCK_BONUS_SECS);
            }
        }),
        Variant::Boss => builder
            .exclude_from_stats(false)
            .on_click(|_context| {})
            .on_remove(|context| {
                if context.hits() >= BOSS_HITS {
                    context.add_score(BOSS_BONUS);
                    context.add_tally(BOSS_BONUS);
                    return Removal::Remove;
                }
                Removal::Keep {
                    resize_to: Some(context.size_px() + BOSS_GROWTH_PX),
                }
            }),
    };

    builder.build()
}

/// Builds every variant, applying the overrides keyed by class tag.
pub fn lineup(tunings: &BTreeMap<String, Tuning>) -> Result<Vec<Entity>, RosterError> {
    if let Some(unknown) = tunings
        .keys()
        .find(|tag| Variant::from_class_tag(tag).is_none())
    {
        return Err(RosterError::UnknownEntity(unknown.clone()));
    }

    let default = Tuning::default();
    Variant::ALL
        .into_iter()
        .map(|variant| {
            let tuning = tunings.get(variant.class_tag()).unwrap_or(&default);
            entity(variant, tuning).map_err(RosterError::from)
        })
        .collect()
}

/// Registers the full lineup with the session.
pub fn install(
    session: &mut Session,
    tunings: &BTreeMap<String, Tuning>,
) -> Result<(), RosterError> {
    for entity in lineup(tunings)? {
        debug!(class_tag = %entity.class_tag(), "installing entity");
        session.register(entity)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_tags_resolve_back_to_variants() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_class_tag(variant.class_tag()), Some(variant));
        }
        assert_eq!(Variant::from_class_tag("hamster"), None);
    }

    #[test]
    fn defaults_follow_reference_timings() {
        let cat = entity(Variant::Cat, &Tuning::default()).expect("cat");
        let dog = entity(Variant::Dog, &Tuning::default()).expect("dog");
        let fish = entity(Variant::Fish, &Tuning::default()).expect("fish");

        assert_eq!(cat.spawn_interval(), Duration::from_millis(150));
        assert_eq!(cat.spawn_mode(), Some(SpawnMode::Exclusive));
        assert_eq!(dog.spawn_interval(), Duration::from_millis(450));
        assert_eq!(dog.spawn_mode(), Some(SpawnMode::Replacing));
        assert_eq!(fish.spawn_interval(), Duration::from_millis(750));
        assert!(fish.spawn_probability() < 1.0);
    }

    #[test]
    fn tuning_overrides_spawn_parameters() {
        let tuning = Tuning {
            spawn_every_ms: Some(90),
            spawn_probability: Some(0.25),
            spawn_mode: Some("Continuous".to_owned()),
        };
        let cat = entity(Variant::Cat, &tuning).expect("tuned cat");

        assert_eq!(cat.spawn_interval(), Duration::from_millis(90));
        assert_eq!(cat.spawn_probability(), 0.25);
        assert_eq!(cat.spawn_mode(), Some(SpawnMode::Replacing));
    }

    #[test]
    fn unknown_mode_leaves_entity_without_spawn_mode() {
        let tuning = Tuning {
            spawn_mode: Some("sometimes".to_owned()),
            ..Tuning::default()
        };
        let dog = entity(Variant::Dog, &tuning).expect("dog still builds");
        assert_eq!(dog.spawn_mode(), None);
    }

    #[test]
    fn invalid_tuning_is_rejected() {
        let tuning = Tuning {
            spawn_every_ms: Some(0),
            ..Tuning::default()
        };
        assert!(matches!(
            entity(Variant::Clock, &tuning),
            Err(EntityError::ZeroSpawnInterval { .. })
        ));
    }

    #[test]
    fn lineup_rejects_tuning_for_unknown_entities() {
        let mut tunings = BTreeMap::new();
        let _ = tunings.insert("hamster".to_owned(), Tuning::default());

        assert!(matches!(
            lineup(&tunings),
            Err(RosterError::UnknownEntity(tag)) if tag == "hamster"
        ));
    }
}
