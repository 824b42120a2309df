//! Scripted player that clicks whatever it can see.

use pounce_core::{Position, VisualHandle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::terminal::Playfield;

const HAZARDS: [&str; 1] = ["dog"];
const SHAKE_MISS_CHANCE: f64 = 0.5;
const STREAM: u64 = 0x00a1_7091;

/// Picks one visual to click per frame.
///
/// The biggest target wins, ties go to the one closest to the last click.
/// Hazards are avoided unless the player fumbles, which happens with the
/// configured clumsiness. A shaking screen makes every other click miss.
#[derive(Debug)]
pub(crate) struct Autoplayer {
    rng: ChaCha8Rng,
    clumsiness: f64,
    cursor: Position,
}

impl Autoplayer {
    pub(crate) fn new(seed: u64, clumsiness: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed ^ STREAM),
            clumsiness: clumsiness.clamp(0.0, 1.0),
            cursor: Position { x: 0.0, y: 0.0 },
        }
    }

    pub(crate) fn choose(&mut self, playfield: &Playfield) -> Option<VisualHandle> {
        if playfield.shaking && self.rng.gen_bool(SHAKE_MISS_CHANCE) {
            return None;
        }
        let fumble = self.rng.gen_bool(self.clumsiness);
        let cursor = self.cursor;

        let (handle, sprite) = playfield
            .sprites
            .iter()
            .filter(|(_, sprite)| HAZARDS.contains(&sprite.class_tag.as_str()) == fumble)
            .max_by(|(_, left), (_, right)| {
                left.size_px.cmp(&right.size_px).then_with(|| {
                    distance(right.position, cursor).total_cmp(&distance(left.position, cursor))
                })
            })?;

        self.cursor = sprite.position;
        Some(*handle)
    }
}

fn distance(from: Position, to: Position) -> f32 {
    (from.x - to.x).hypot(from.y - to.y)
}
