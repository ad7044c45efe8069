//! One simulation step of the PLAYING phase
//!
//! Order within a tick: players move, grippers follow, grab presses resolve,
//! baskets collect, then the spawn timer may add an item.

use super::entity::GripOutcome;
use super::timer::{TimerId, TimerManager};
use super::world::SimulationWorld;
use crate::input::{PlayerId, TickInput};

/// What happened during a step (for logging and tests)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub grips: [GripOutcome; 2],
    /// Items each basket collected this step
    pub deposits: [u32; 2],
    /// Id of the item spawned this step, if any
    pub spawned: Option<u32>,
}

/// Advance the world by one tick of play
pub fn step(
    world: &mut SimulationWorld,
    timers: &mut TimerManager,
    input: &TickInput,
    now_ms: u64,
    spawn_interval_ms: u64,
) -> StepReport {
    let mut report = StepReport::default();

    for id in PlayerId::ALL {
        let cmd = input.player(id);
        let i = id.index();
        world.players[i].advance(cmd.forward, cmd.strafe, cmd.rotate);
        world.grippers[i].follow(&mut world.players[i]);
    }

    for id in PlayerId::ALL {
        let i = id.index();
        if input.player(id).grab {
            world.grippers[i].press();
        }

        let outcome = world.resolve_grip(id);

        match outcome {
            GripOutcome::PickedUp(item) => {
                log::debug!("Player {} picked up item {}", id.number(), item)
            }
            GripOutcome::Dropped(item) => {
                log::debug!("Player {} dropped item {}", id.number(), item)
            }
            GripOutcome::Idle => {}
        }
        report.grips[i] = outcome;
    }

    for (i, basket) in world.baskets.iter_mut().enumerate() {
        let collected = basket.collect(&mut world.items);
        if collected > 0 {
            log::debug!("Basket {} collected {} item(s)", i + 1, collected);
        }
        report.deposits[i] = collected;
    }

    if timers.check_repeating(TimerId::ItemSpawn, now_ms, spawn_interval_ms) {
        report.spawned = Some(world.spawn_item_in_pool());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PlayerCommand;
    use glam::Vec2;
    use proptest::prelude::*;

    fn grab(id: PlayerId) -> TickInput {
        let mut input = TickInput::default();
        input.player_mut(id).grab = true;
        input
    }

    #[test]
    fn test_grab_picks_up_single_colliding_item() {
        let mut world = SimulationWorld::new(1);
        let mut timers = TimerManager::new();
        let at = world.gripper(PlayerId::One).pos;
        let item = world.spawn_item_at(at);

        let report = step(&mut world, &mut timers, &grab(PlayerId::One), 0, 2000);
        assert_eq!(report.grips[0], GripOutcome::PickedUp(item));
        assert!(world.gripper(PlayerId::One).has_item);
        assert!(world.player(PlayerId::One).has_item);
        assert!(world.items.is_empty());
    }

    #[test]
    fn test_second_grab_before_release_leaves_items_alone() {
        let mut world = SimulationWorld::new(1);
        let mut timers = TimerManager::new();
        let at = world.gripper(PlayerId::One).pos;
        world.spawn_item_at(at);
        step(&mut world, &mut timers, &grab(PlayerId::One), 0, 2000);

        // Another item under the claw: the next press drops, never picks
        let other = world.spawn_item_at(at);
        let report = step(&mut world, &mut timers, &grab(PlayerId::One), 16, 2000);
        assert!(matches!(report.grips[0], GripOutcome::Dropped(_)));
        assert!(world.items.iter().any(|i| i.id == other));
        assert_eq!(world.items.len(), 2);
    }

    #[test]
    fn test_release_spawns_one_item_at_gripper() {
        let mut world = SimulationWorld::new(1);
        let mut timers = TimerManager::new();
        world.grippers[1].has_item = true;

        let report = step(&mut world, &mut timers, &grab(PlayerId::Two), 0, 2000);
        let GripOutcome::Dropped(id) = report.grips[1] else {
            panic!("expected a drop, got {:?}", report.grips[1]);
        };
        assert_eq!(world.items.len(), 1);
        assert_eq!(world.items[0].id, id);
        assert_eq!(world.items[0].pos, world.gripper(PlayerId::Two).pos);
        assert!(!world.gripper(PlayerId::Two).has_item);
        assert!(!world.player(PlayerId::Two).has_item);
    }

    #[test]
    fn test_holding_grab_does_not_repeat() {
        let mut world = SimulationWorld::new(1);
        let mut timers = TimerManager::new();
        let at = world.gripper(PlayerId::One).pos;
        world.spawn_item_at(at);

        step(&mut world, &mut timers, &grab(PlayerId::One), 0, 2000);
        // No new edge: the held item stays held
        for t in 1..10 {
            step(&mut world, &mut timers, &TickInput::default(), t * 16, 2000);
        }
        assert!(world.gripper(PlayerId::One).has_item);
        assert!(world.items.is_empty());
    }

    #[test]
    fn test_item_in_basket_scores_one() {
        let mut world = SimulationWorld::new(1);
        let mut timers = TimerManager::new();
        let center = world.basket(PlayerId::Two).bounds().center();
        world.spawn_item_at(center);

        let report = step(&mut world, &mut timers, &TickInput::default(), 0, 2000);
        assert_eq!(report.deposits, [0, 1]);
        assert_eq!(world.scores(), [0, 1]);
        assert!(world.items.is_empty());
    }

    #[test]
    fn test_drop_into_basket_scores() {
        let mut world = SimulationWorld::new(1);
        let mut timers = TimerManager::new();
        let basket = world.basket(PlayerId::One).bounds().center();
        // Park player one so its claw is over its basket
        world.players[0].pos = basket - Vec2::new(crate::consts::GRIPPER_OFFSET, 0.0);
        world.players[0].pos.x = world.players[0].pos.x.max(crate::consts::PLAYER_SIZE / 2.0);
        world.grippers[0].has_item = true;
        world.players[0].heading = 0.0;

        step(&mut world, &mut timers, &grab(PlayerId::One), 0, 2000);
        assert_eq!(world.basket(PlayerId::One).score, 1);
        assert!(world.items.is_empty());
    }

    #[test]
    fn test_spawn_timer_repeats() {
        let mut world = SimulationWorld::new(3);
        let mut timers = TimerManager::new();
        let idle = TickInput::default();

        // First tick arms the timer
        assert_eq!(step(&mut world, &mut timers, &idle, 0, 2000).spawned, None);
        assert_eq!(step(&mut world, &mut timers, &idle, 1999, 2000).spawned, None);
        assert!(step(&mut world, &mut timers, &idle, 2000, 2000).spawned.is_some());
        assert!(step(&mut world, &mut timers, &idle, 4000, 2000).spawned.is_some());
        assert_eq!(world.items.len(), 2);
    }

    fn command() -> impl Strategy<Value = PlayerCommand> {
        (-5.0f32..5.0, -5.0f32..5.0, -5.0f32..5.0, any::<bool>()).prop_map(
            |(forward, strafe, rotate, grab)| PlayerCommand {
                forward,
                strafe,
                rotate,
                grab,
                ..Default::default()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_total_score_never_decreases(
            commands in proptest::collection::vec((command(), command()), 1..200)
        ) {
            let mut world = SimulationWorld::new(11);
            let mut timers = TimerManager::new();
            let mut last = 0;
            for (t, (p1, p2)) in commands.into_iter().enumerate() {
                let input = TickInput { players: [p1, p2], ..Default::default() };
                step(&mut world, &mut timers, &input, t as u64 * 100, 200);
                let total = world.total_score();
                prop_assert!(total >= last);
                last = total;
            }
        }

        #[test]
        fn prop_players_stay_on_screen(
            commands in proptest::collection::vec((command(), command()), 1..300)
        ) {
            let mut world = SimulationWorld::new(5);
            let mut timers = TimerManager::new();
            for (t, (p1, p2)) in commands.into_iter().enumerate() {
                let input = TickInput { players: [p1, p2], ..Default::default() };
                step(&mut world, &mut timers, &input, t as u64 * 16, 2000);
            }
            for player in &world.players {
                let b = player.bounds();
                prop_assert!(b.min.x >= 0.0 && b.min.y >= 0.0);
                prop_assert!(b.max.x <= crate::consts::WIDTH && b.max.y <= crate::consts::HEIGHT);
            }
        }
    }
}
