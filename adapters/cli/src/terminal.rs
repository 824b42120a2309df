//! Terminal implementations of the session collaborators.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    io::{self, BufRead, Write},
    rc::Rc,
};

use pounce_core::{
    Audio, AudioError, Bounds, ClassTag, Effect, Position, Prompter, Renderer, RoundSummary,
    Scoreboard, SoundRef, VisualHandle, VisualRef,
};
use tracing::{debug, error};

/// Width of the virtual play area in pixels.
pub(crate) const PLAY_AREA_WIDTH: f32 = 640.0;
/// Height of the virtual play area in pixels.
pub(crate) const PLAY_AREA_HEIGHT: f32 = 480.0;

/// Visual currently shown on the play area.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Sprite {
    pub(crate) class_tag: ClassTag,
    pub(crate) size_px: u32,
    pub(crate) position: Position,
}

/// Shared view of what the terminal renderer is displaying.
#[derive(Debug, Default)]
pub(crate) struct Playfield {
    next_handle: u64,
    pub(crate) sprites: BTreeMap<VisualHandle, Sprite>,
    pub(crate) shaking: bool,
}

pub(crate) type SharedPlayfield = Rc<RefCell<Playfield>>;

impl Playfield {
    pub(crate) fn shared() -> SharedPlayfield {
        Rc::new(RefCell::new(Self::default()))
    }
}

/// Renderer that keeps sprites in memory and narrates changes to the log.
pub(crate) struct TerminalRenderer {
    playfield: SharedPlayfield,
}

impl TerminalRenderer {
    pub(crate) fn new(playfield: SharedPlayfield) -> Self {
        Self { playfield }
    }
}

impl Renderer for TerminalRenderer {
    fn place(
        &mut self,
        appearance: &VisualRef,
        class_tag: &ClassTag,
        size_px: u32,
        position: Position,
    ) -> VisualHandle {
        let mut playfield = self.playfield.borrow_mut();
        playfield.next_handle += 1;
        let handle = VisualHandle::new(playfield.next_handle);
        debug!(
            %class_tag,
            appearance = appearance.as_str(),
            handle = handle.get(),
            "drawing sprite"
        );
        let _ = playfield.sprites.insert(
            handle,
            Sprite {
                class_tag: class_tag.clone(),
                size_px,
                position,
            },
        );
        handle
    }

    fn remove(&mut self, visual: VisualHandle) {
        let _ = self.playfield.borrow_mut().sprites.remove(&visual);
    }

    fn resize(&mut self, visual: VisualHandle, size_px: u32) {
        if let Some(sprite) = self.playfield.borrow_mut().sprites.get_mut(&visual) {
            sprite.size_px = size_px;
        }
    }

    fn bounds(&self, margin_px: u32) -> Bounds {
        Bounds::inset(
            Bounds::new(0.0, PLAY_AREA_WIDTH, 0.0, PLAY_AREA_HEIGHT),
            margin_px as f32,
        )
    }

    fn clear(&mut self) {
        self.playfield.borrow_mut().sprites.clear();
    }

    fn start_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Shake => self.playfield.borrow_mut().shaking = true,
        }
        println!("~~ the screen shakes ~~");
    }

    fn stop_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Shake => self.playfield.borrow_mut().shaking = false,
        }
    }
}

/// Prints sounds instead of playing them.
pub(crate) struct TerminalAudio;

impl Audio for TerminalAudio {
    fn play(&mut self, sound: &SoundRef) -> Result<(), AudioError> {
        debug!(%sound, "sound");
        Ok(())
    }

    fn play_music(&mut self, track: &SoundRef) -> Result<(), AudioError> {
        println!("(now playing {track})");
        Ok(())
    }
}

/// Prints display updates, skipping repeats.
#[derive(Debug, Default)]
pub(crate) struct TerminalScoreboard {
    score: Option<i64>,
    time: Option<i64>,
}

impl Scoreboard for TerminalScoreboard {
    fn set_score(&mut self, score: i64) {
        if self.score.replace(score) != Some(score) {
            println!("{score} pts");
        }
    }

    fn set_time(&mut self, remaining_secs: i64) {
        if self.time.replace(remaining_secs) != Some(remaining_secs) {
            println!("Time: {remaining_secs}s");
        }
    }

    fn set_high_score(&mut self, score: i64) {
        println!("High score: {score}");
    }

    fn set_credits(&mut self, credits: i64) {
        println!("Credits: {credits}");
    }

    fn present_summary(&mut self, summary: &RoundSummary) {
        println!();
        println!("{}", summary.headline());
        println!("Time left: {}s", summary.remaining_secs);
        for line in &summary.breakdown {
            println!("  {:<8} {:>5}", line.class_tag, line.score);
        }
        println!(
            "Credits earned: {} (balance {})",
            summary.credits_awarded, summary.credits_total
        );
    }

    fn announce_high_score(&mut self, score: i64) {
        println!("New high score: {score}!");
    }

    fn report_fatal(&mut self, message: &str) {
        error!(message, "fatal configuration error");
        eprintln!("Error: {message}. Restart the game.");
    }
}

/// Asks questions on standard input.
#[derive(Debug, Default)]
pub(crate) struct StdinPrompter;

impl StdinPrompter {
    fn read_line(prompt: &str) -> Option<String> {
        print!("{prompt} ");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
}

impl Prompter for StdinPrompter {
    fn ask_text(&mut self, prompt: &str) -> Option<String> {
        Self::read_line(prompt)
    }

    fn ask_yes_no(&mut self, prompt: &str) -> bool {
        loop {
            let Some(answer) = Self::read_line(&format!("{prompt} (yes/no)")) else {
                return false;
            };
            match parse_yes_no(&answer) {
                Some(answer) => return answer,
                None => println!("Please answer yes or no."),
            }
        }
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
