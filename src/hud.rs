//! Render-facing summary of one frame
//!
//! A frontend (or the headless console driver) draws from a `HudSnapshot`
//! and never touches `Game` directly.

use glam::Vec2;

use crate::input::PlayerId;
use crate::sim::{EntityKind, Game, GamePhase};

/// Match clock as `MM:SS` (whole seconds, truncated)
pub fn format_clock(time_left: f32) -> String {
    let secs = time_left.max(0.0) as u32;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub kind: EntityKind,
    pub center: Vec2,
    pub size: Vec2,
    pub heading: Option<f32>,
    pub owner: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamScore {
    pub player: PlayerId,
    /// "Player Blue" / "Player Red"
    pub label: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOverSummary {
    pub teams: [TeamScore; 2],
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HudSnapshot {
    pub phase: GamePhase,
    pub clock_text: String,
    pub countdown: Option<u32>,
    pub scores: [u32; 2],
    pub ready: [bool; 2],
    pub game_over: Option<GameOverSummary>,
    pub entities: Vec<EntityView>,
}

impl HudSnapshot {
    pub fn capture(game: &Game) -> Self {
        let scores = game.world.scores();
        let game_over = (game.phase == GamePhase::GameOver).then(|| GameOverSummary {
            teams: PlayerId::ALL.map(|id| TeamScore {
                player: id,
                label: format!("Player {}", id.team_name()),
                score: scores[id.index()],
            }),
            total: scores.iter().sum(),
        });

        let entities = game
            .world
            .entities()
            .into_iter()
            .map(|e| {
                let bounds = e.bounds();
                EntityView {
                    kind: e.kind(),
                    center: bounds.center(),
                    size: bounds.size(),
                    heading: e.heading(),
                    owner: e.owner(),
                }
            })
            .collect();

        Self {
            phase: game.phase,
            clock_text: format_clock(game.clock.time_left),
            countdown: game.countdown_display(),
            scores,
            ready: game.ready,
            game_over,
            entities,
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    /// Text lines for a console frontend
    pub fn lines(&self) -> Vec<String> {
        match self.phase {
            GamePhase::MainMenu => PlayerId::ALL
                .iter()
                .map(|id| {
                    let state = if self.ready[id.index()] {
                        "READY"
                    } else {
                        "press ready"
                    };
                    format!("Player {}: {}", id.team_name(), state)
                })
                .collect(),
            GamePhase::Countdown => {
                vec![format!("Starting in {}", self.countdown.unwrap_or(1))]
            }
            GamePhase::Playing => vec![format!(
                "{}  Blue {}  Red {}  Items {}",
                self.clock_text,
                self.scores[0],
                self.scores[1],
                self.count(EntityKind::Item)
            )],
            GamePhase::GameOver => {
                let mut lines = vec!["GAME OVER".to_string()];
                if let Some(summary) = &self.game_over {
                    lines.extend(
                        summary
                            .teams
                            .iter()
                            .map(|t| format!("{}: {}", t.label, t.score)),
                    );
                    lines.push(format!("Total: {}", summary.total));
                }
                lines
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RoundTimings;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(60.0), "01:00");
        assert_eq!(format_clock(59.99), "00:59");
        assert_eq!(format_clock(125.0), "02:05");
        assert_eq!(format_clock(0.4), "00:00");
        assert_eq!(format_clock(-3.0), "00:00");
    }

    #[test]
    fn test_menu_snapshot() {
        let mut game = Game::new(1, RoundTimings::default());
        game.ready[1] = true;
        let hud = HudSnapshot::capture(&game);

        assert_eq!(hud.phase, GamePhase::MainMenu);
        assert_eq!(hud.clock_text, "01:00");
        assert_eq!(hud.countdown, None);
        assert_eq!(hud.game_over, None);
        assert_eq!(hud.count(EntityKind::Player), 2);
        assert_eq!(hud.count(EntityKind::Gripper), 2);
        assert_eq!(hud.count(EntityKind::Basket), 2);
        assert_eq!(
            hud.lines(),
            vec!["Player Blue: press ready", "Player Red: READY"]
        );
    }

    #[test]
    fn test_game_over_summary() {
        let mut game = Game::new(1, RoundTimings::default());
        game.world.baskets[0].score = 3;
        game.world.baskets[1].score = 5;
        game.phase = GamePhase::GameOver;

        let hud = HudSnapshot::capture(&game);
        let summary = hud.game_over.clone().unwrap();
        assert_eq!(summary.total, 8);
        assert_eq!(summary.teams[0].label, "Player Blue");
        assert_eq!(summary.teams[1].score, 5);
        assert_eq!(hud.lines().last().map(String::as_str), Some("Total: 8"));
    }

    #[test]
    fn test_entity_views_follow_world() {
        let mut game = Game::new(1, RoundTimings::default());
        let at = game.world.gripper(PlayerId::One).pos;
        game.world.spawn_item_at(at);

        let hud = HudSnapshot::capture(&game);
        let item = hud
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Item)
            .unwrap();
        assert_eq!(item.center, at);
        assert_eq!(item.owner, None);

        let player = hud
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Player && e.owner == Some(PlayerId::Two))
            .unwrap();
        assert_eq!(player.heading, Some(180.0));
    }
}
