//! Resolution of the name a round is played under.

use pounce_core::{Prompter, DEFAULT_PLAYER_NAME};

/// Determines the player's name, offering returning players their saved one.
///
/// Dismissed or blank answers fall back to [`DEFAULT_PLAYER_NAME`].
pub fn resolve_player_name(prompter: &mut dyn Prompter, saved_name: Option<&str>) -> String {
    let saved = saved_name.map(str::trim).filter(|name| !name.is_empty());
    if let Some(name) = saved {
        if prompter.ask_yes_no(&format!("Welcome back! Continue as {name}?")) {
            return name.to_owned();
        }
    }

    prompter
        .ask_text("What is your name?")
        .map(|answer| answer.trim().to_owned())
        .filter(|answer| !answer.is_empty())
        .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    struct Scripted {
        texts: VecDeque<Option<String>>,
        answers: VecDeque<bool>,
        asked: Vec<String>,
    }

    impl Prompter for Scripted {
        fn ask_text(&mut self, prompt: &str) -> Option<String> {
            self.asked.push(prompt.to_owned());
            self.texts.pop_front().flatten()
        }

        fn ask_yes_no(&mut self, prompt: &str) -> bool {
            self.asked.push(prompt.to_owned());
            self.answers.pop_front().unwrap_or(false)
        }
    }

    #[test]
    fn new_players_are_asked_for_a_name() {
        let mut prompter = Scripted {
            texts: VecDeque::from([Some("  Ada  ".to_owned())]),
            ..Scripted::default()
        };
        assert_eq!(resolve_player_name(&mut prompter, None), "Ada");
        assert_eq!(prompter.asked, ["What is your name?"]);
    }

    #[test]
    fn dismissed_prompt_falls_back_to_default() {
        let mut prompter = Scripted {
            texts: VecDeque::from([None]),
            ..Scripted::default()
        };
        assert_eq!(resolve_player_name(&mut prompter, Some("   ")), "Player");

        let mut prompter = Scripted {
            texts: VecDeque::from([Some(String::new())]),
            ..Scripted::default()
        };
        assert_eq!(resolve_player_name(&mut prompter, None), "Player");
    }

    #[test]
    fn returning_players_confirm_their_name() {
        let mut prompter = Scripted {
            answers: VecDeque::from([true]),
            ..Scripted::default()
        };
        assert_eq!(resolve_player_name(&mut prompter, Some("Bo")), "Bo");
        assert_eq!(prompter.asked, ["Welcome back! Continue as Bo?"]);
    }

    #[test]
    fn returning_players_may_pick_a_new_name() {
        let mut prompter = Scripted {
            answers: VecDeque::from([false]),
            texts: VecDeque::from([Some("Cy".to_owned())]),
            ..Scripted::default()
        };
        assert_eq!(resolve_player_name(&mut prompter, Some("Bo")), "Cy");
        assert_eq!(prompter.asked.len(), 2);
    }
}
