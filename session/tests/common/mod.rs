#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
    time::Duration,
};

use pounce_core::{
    Audio, AudioError, Bounds, ClassTag, Command, Effect, Event, Persistence, PersistenceError,
    Position, Renderer, RoundSummary, SavedSession, Scoreboard, SoundRef, VisualHandle, VisualRef,
};
use pounce_session::{apply, Collaborators, Session, SessionConfig};

pub const PLAY_AREA: Bounds = Bounds::new(0.0, 400.0, 0.0, 300.0);

#[derive(Debug, Default)]
pub struct Stage {
    pub next_handle: u64,
    pub visuals: BTreeMap<VisualHandle, (ClassTag, u32, Position)>,
    pub effects: BTreeSet<Effect>,
    pub clears: usize,
    pub placements: usize,
}

impl Stage {
    pub fn count(&self, tag: &str) -> usize {
        self.visuals
            .values()
            .filter(|(class_tag, _, _)| class_tag.as_str() == tag)
            .count()
    }

    pub fn handle_of(&self, tag: &str) -> Option<VisualHandle> {
        self.visuals
            .iter()
            .find(|(_, (class_tag, _, _))| class_tag.as_str() == tag)
            .map(|(handle, _)| *handle)
    }
}

pub struct FakeRenderer(pub Rc<RefCell<Stage>>);

impl Renderer for FakeRenderer {
    fn place(
        &mut self,
        _appearance: &VisualRef,
        class_tag: &ClassTag,
        size_px: u32,
        position: Position,
    ) -> VisualHandle {
        let mut stage = self.0.borrow_mut();
        stage.next_handle += 1;
        stage.placements += 1;
        let handle = VisualHandle::new(stage.next_handle);
        let _ = stage
            .visuals
            .insert(handle, (class_tag.clone(), size_px, position));
        handle
    }

    fn remove(&mut self, visual: VisualHandle) {
        let _ = self.0.borrow_mut().visuals.remove(&visual);
    }

    fn resize(&mut self, visual: VisualHandle, size_px: u32) {
        if let Some(entry) = self.0.borrow_mut().visuals.get_mut(&visual) {
            entry.1 = size_px;
        }
    }

    fn bounds(&self, margin_px: u32) -> Bounds {
        Bounds::inset(PLAY_AREA, margin_px as f32)
    }

    fn clear(&mut self) {
        let mut stage = self.0.borrow_mut();
        stage.visuals.clear();
        stage.clears += 1;
    }

    fn start_effect(&mut self, effect: Effect) {
        let _ = self.0.borrow_mut().effects.insert(effect);
    }

    fn stop_effect(&mut self, effect: Effect) {
        let _ = self.0.borrow_mut().effects.remove(&effect);
    }
}

#[derive(Debug, Default)]
pub struct Speaker {
    pub played: Vec<SoundRef>,
    pub music: Vec<SoundRef>,
    pub broken: bool,
}

pub struct FakeAudio(pub Rc<RefCell<Speaker>>);

impl Audio for FakeAudio {
    fn play(&mut self, sound: &SoundRef) -> Result<(), AudioError> {
        let mut speaker = self.0.borrow_mut();
        if speaker.broken {
            return Err(AudioError {
                sound: sound.clone(),
                reason: "autoplay blocked".to_owned(),
            });
        }
        speaker.played.push(sound.clone());
        Ok(())
    }

    fn play_music(&mut self, track: &SoundRef) -> Result<(), AudioError> {
        let mut speaker = self.0.borrow_mut();
        if speaker.broken {
            return Err(AudioError {
                sound: track.clone(),
                reason: "autoplay blocked".to_owned(),
            });
        }
        speaker.music.push(track.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Board {
    pub score: Option<i64>,
    pub time: Option<i64>,
    pub high_score: Option<i64>,
    pub credits: Option<i64>,
    pub summaries: Vec<RoundSummary>,
    pub high_score_notices: Vec<i64>,
    pub fatal: Vec<String>,
}

pub struct FakeScoreboard(pub Rc<RefCell<Board>>);

impl Scoreboard for FakeScoreboard {
    fn set_score(&mut self, score: i64) {
        self.0.borrow_mut().score = Some(score);
    }

    fn set_time(&mut self, remaining_secs: i64) {
        self.0.borrow_mut().time = Some(remaining_secs);
    }

    fn set_high_score(&mut self, score: i64) {
        self.0.borrow_mut().high_score = Some(score);
    }

    fn set_credits(&mut self, credits: i64) {
        self.0.borrow_mut().credits = Some(credits);
    }

    fn present_summary(&mut self, summary: &RoundSummary) {
        self.0.borrow_mut().summaries.push(summary.clone());
    }

    fn announce_high_score(&mut self, score: i64) {
        self.0.borrow_mut().high_score_notices.push(score);
    }

    fn report_fatal(&mut self, message: &str) {
        self.0.borrow_mut().fatal.push(message.to_owned());
    }
}

#[derive(Debug, Default)]
pub struct Vault {
    pub saved: SavedSession,
    pub saves: usize,
    pub unavailable: bool,
}

pub struct FakePersistence(pub Rc<RefCell<Vault>>);

impl Persistence for FakePersistence {
    fn load_session(&mut self) -> Result<SavedSession, PersistenceError> {
        let vault = self.0.borrow();
        if vault.unavailable {
            return Err(PersistenceError::Unavailable("offline".to_owned()));
        }
        Ok(vault.saved.clone())
    }

    fn save_session(&mut self, session: &SavedSession) -> Result<(), PersistenceError> {
        let mut vault = self.0.borrow_mut();
        if vault.unavailable {
            return Err(PersistenceError::Unavailable("offline".to_owned()));
        }
        vault.saved = session.clone();
        vault.saves += 1;
        Ok(())
    }
}

/// Session wired to recording fakes.
pub struct Harness {
    pub session: Session,
    pub stage: Rc<RefCell<Stage>>,
    pub speaker: Rc<RefCell<Speaker>>,
    pub board: Rc<RefCell<Board>>,
    pub vault: Rc<RefCell<Vault>>,
    pub completions: Rc<RefCell<Vec<RoundSummary>>>,
    pub events: Vec<Event>,
}

impl Harness {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_saved(config, SavedSession::default())
    }

    pub fn with_saved(config: SessionConfig, saved: SavedSession) -> Self {
        let stage = Rc::new(RefCell::new(Stage::default()));
        let speaker = Rc::new(RefCell::new(Speaker::default()));
        let board = Rc::new(RefCell::new(Board::default()));
        let vault = Rc::new(RefCell::new(Vault {
            saved,
            ..Vault::default()
        }));
        let completions = Rc::new(RefCell::new(Vec::new()));

        let hook_log = Rc::clone(&completions);
        let collaborators = Collaborators::new(
            Box::new(FakeRenderer(Rc::clone(&stage))),
            Box::new(FakeAudio(Rc::clone(&speaker))),
            Box::new(FakeScoreboard(Rc::clone(&board))),
            Box::new(FakePersistence(Rc::clone(&vault))),
        )
        .on_round_complete(move |summary| hook_log.borrow_mut().push(summary.clone()));

        Self {
            session: Session::new(config, collaborators),
            stage,
            speaker,
            board,
            vault,
            completions,
            events: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.send(Command::StartRound)
            .expect("round starts without error");
    }

    pub fn advance(&mut self, dt: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        apply(&mut self.session, Command::Tick { dt }, &mut events)
            .expect("ticks never fail");
        self.events.extend(events.iter().cloned());
        events
    }

    pub fn click(&mut self, visual: VisualHandle) -> Vec<Event> {
        let mut events = Vec::new();
        apply(&mut self.session, Command::Click { visual }, &mut events)
            .expect("click succeeds");
        self.events.extend(events.iter().cloned());
        events
    }

    pub fn send(&mut self, command: Command) -> Result<Vec<Event>, pounce_session::SessionError> {
        let mut events = Vec::new();
        let result = apply(&mut self.session, command, &mut events);
        self.events.extend(events.iter().cloned());
        result.map(|()| events)
    }
}

pub fn tag(name: &str) -> ClassTag {
    ClassTag::new(name)
}
