//! Group system integration tests.
//!
//! Drives [`GroupSystem`] through a [`Pipeline`] with real `bevy_ecs` worlds
//! and checks toggling, cascade order and teardown.

use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::*;

use ecsgroups::error::PipelineResult;
use ecsgroups::events::grouptoggle::{GroupKey, ToggleRecord, send_toggle};
use ecsgroups::pipeline::Pipeline;
use ecsgroups::system::{
    DestroySystem, InitSystem, PostDestroySystem, PreInitSystem, RunSystem, System,
};
use ecsgroups::systems::group::GroupSystem;
use ecsgroups::worlds::Worlds;

// =============================================================================
// Helpers
// =============================================================================

type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Copy)]
struct Caps {
    pre_init: bool,
    init: bool,
    run: bool,
    destroy: bool,
    post_destroy: bool,
}

const ALL: Caps = Caps {
    pre_init: true,
    init: true,
    run: true,
    destroy: true,
    post_destroy: true,
};

const RUN_ONLY: Caps = Caps {
    pre_init: false,
    init: false,
    run: true,
    destroy: false,
    post_destroy: false,
};

/// Nested system that records `"<name>.<Phase>"` for every call it receives.
struct Probe {
    name: &'static str,
    caps: Caps,
    log: CallLog,
}

impl Probe {
    fn boxed(name: &'static str, caps: Caps, log: &CallLog) -> Box<dyn System> {
        Box::new(Probe {
            name,
            caps,
            log: log.clone(),
        })
    }

    fn record(&self, phase: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.{}", self.name, phase));
    }
}

impl PreInitSystem for Probe {
    fn pre_init(&mut self, _worlds: &mut Worlds) -> PipelineResult<()> {
        self.record("PreInit");
        Ok(())
    }
}

impl InitSystem for Probe {
    fn init(&mut self, _worlds: &mut Worlds) -> PipelineResult<()> {
        self.record("Init");
        Ok(())
    }
}

impl RunSystem for Probe {
    fn run(&mut self, _worlds: &mut Worlds) -> PipelineResult<()> {
        self.record("Run");
        Ok(())
    }
}

impl DestroySystem for Probe {
    fn destroy(&mut self, _worlds: &mut Worlds) -> PipelineResult<()> {
        self.record("Destroy");
        Ok(())
    }
}

impl PostDestroySystem for Probe {
    fn post_destroy(&mut self, _worlds: &mut Worlds) -> PipelineResult<()> {
        self.record("PostDestroy");
        Ok(())
    }
}

impl System for Probe {
    fn name(&self) -> &str {
        self.name
    }

    fn as_pre_init(&mut self) -> Option<&mut dyn PreInitSystem> {
        if self.caps.pre_init { Some(self) } else { None }
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        if self.caps.init { Some(self) } else { None }
    }

    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        if self.caps.run { Some(self) } else { None }
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        if self.caps.destroy { Some(self) } else { None }
    }

    fn as_post_destroy(&mut self) -> Option<&mut dyn PostDestroySystem> {
        if self.caps.post_destroy { Some(self) } else { None }
    }
}

fn take(log: &CallLog) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

fn make_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new(World::new());
    pipeline.add_world("events", World::new()).unwrap();
    pipeline
}

fn send(pipeline: &mut Pipeline, name: &str, state: bool) -> Entity {
    send_toggle(
        pipeline.world_mut(Some("events")).unwrap(),
        name.to_string(),
        state,
    )
}

fn pending<K: GroupKey>(pipeline: &mut Pipeline, world: Option<&str>) -> Vec<ToggleRecord<K>> {
    let world = pipeline.world_mut(world).unwrap();
    world
        .query::<&ToggleRecord<K>>()
        .iter(world)
        .cloned()
        .collect()
}

// =============================================================================
// Toggling
// =============================================================================

#[test]
fn render_scenario_enables_on_second_tick_and_stays_enabled() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "render",
            false,
            Some("events"),
            vec![
                Probe::boxed("Draw", RUN_ONLY, &log),
                Probe::boxed("Present", RUN_ONLY, &log),
            ],
        )
        .unwrap();
    pipeline.init().unwrap();

    // Tick 1: no toggle
    pipeline.run().unwrap();
    assert!(take(&log).is_empty());

    // Tick 2: toggle present
    let record = send(&mut pipeline, "render", true);
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Draw.Run", "Present.Run"]);
    assert!(
        pipeline
            .world(Some("events"))
            .unwrap()
            .get_entity(record)
            .is_err(),
        "consumed record entity should be gone"
    );

    // Tick 3: state persists
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Draw.Run", "Present.Run"]);
}

#[test]
fn default_true_runs_from_first_tick() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "physics",
            true,
            Some("events"),
            vec![Probe::boxed("Step", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Step.Run"]);
}

#[test]
fn group_state_matches_default_after_construction() {
    let log = CallLog::default();
    let on = GroupSystem::new("a", true, None, vec![Probe::boxed("A", ALL, &log)]).unwrap();
    let off = GroupSystem::new("b", false, None, vec![Probe::boxed("B", ALL, &log)]).unwrap();
    assert!(on.is_active());
    assert!(!off.is_active());
    assert!(take(&log).is_empty());
}

#[test]
fn disabling_record_suppresses_nested_runs_from_same_tick() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "render",
            true,
            Some("events"),
            vec![Probe::boxed("Draw", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Draw.Run"]);

    send(&mut pipeline, "render", false);
    pipeline.run().unwrap();
    assert!(take(&log).is_empty());
    assert!(pending::<String>(&mut pipeline, Some("events")).is_empty());
}

#[test]
fn non_matching_record_is_left_for_other_groups() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "render",
            false,
            Some("events"),
            vec![Probe::boxed("Draw", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    let record = send(&mut pipeline, "audio", true);
    pipeline.run().unwrap();
    pipeline.run().unwrap();

    assert!(take(&log).is_empty(), "render must stay disabled");
    let events = pipeline.world(Some("events")).unwrap();
    let left = events.get::<ToggleRecord<String>>(record).unwrap();
    assert_eq!(left.name, "audio");
    assert!(left.state);
}

#[test]
fn each_group_consumes_only_its_own_record() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "render",
            false,
            Some("events"),
            vec![Probe::boxed("Draw", RUN_ONLY, &log)],
        )
        .unwrap()
        .add_named_group(
            "audio",
            false,
            Some("events"),
            vec![Probe::boxed("Mix", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    send(&mut pipeline, "audio", true);
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Mix.Run"]);

    send(&mut pipeline, "render", true);
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Draw.Run", "Mix.Run"]);
    assert!(pending::<String>(&mut pipeline, Some("events")).is_empty());
}

#[test]
fn disabled_group_stays_silent_across_ticks() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "render",
            false,
            Some("events"),
            vec![Probe::boxed("Draw", ALL, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();
    take(&log);

    pipeline.run().unwrap();
    pipeline.run().unwrap();
    assert!(take(&log).is_empty());
}

#[test]
fn last_sent_matching_record_wins() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "render",
            false,
            Some("events"),
            vec![Probe::boxed("Draw", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    send(&mut pipeline, "render", true);
    send(&mut pipeline, "render", false);
    pipeline.run().unwrap();
    assert!(take(&log).is_empty());
    assert!(pending::<String>(&mut pipeline, Some("events")).is_empty());

    send(&mut pipeline, "render", false);
    send(&mut pipeline, "render", true);
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Draw.Run"]);
}

#[test]
fn record_sharing_an_entity_only_loses_the_record() {
    #[derive(Component)]
    struct Source(&'static str);

    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "render",
            false,
            Some("events"),
            vec![Probe::boxed("Draw", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    let entity = pipeline
        .world_mut(Some("events"))
        .unwrap()
        .spawn((ToggleRecord::enable("render".to_string()), Source("menu")))
        .id();
    pipeline.run().unwrap();

    assert_eq!(take(&log), vec!["Draw.Run"]);
    let events = pipeline.world(Some("events")).unwrap();
    assert!(events.get::<ToggleRecord<String>>(entity).is_none());
    assert_eq!(events.get::<Source>(entity).map(|s| s.0), Some("menu"));
}

#[test]
fn default_world_can_carry_toggle_records() {
    let log = CallLog::default();
    let mut pipeline = Pipeline::new(World::new());
    pipeline
        .add_named_group(
            "render",
            false,
            None,
            vec![Probe::boxed("Draw", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    send_toggle(
        pipeline.world_mut(None).unwrap(),
        "render".to_string(),
        true,
    );
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Draw.Run"]);
}

#[test]
fn records_spawned_before_init_are_seen() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    send(&mut pipeline, "render", true);
    pipeline
        .add_named_group(
            "render",
            false,
            Some("events"),
            vec![Probe::boxed("Draw", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Draw.Run"]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Layer {
    World,
    Hud,
}

impl GroupKey for Layer {}

#[test]
fn custom_key_types_toggle_by_equality() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_group(
            Layer::Hud,
            false,
            Some("events"),
            vec![Probe::boxed("Hud", RUN_ONLY, &log)],
        )
        .unwrap()
        .add_group(
            7u32,
            false,
            Some("events"),
            vec![Probe::boxed("Seven", RUN_ONLY, &log)],
        )
        .unwrap();
    pipeline.init().unwrap();

    let events = pipeline.world_mut(Some("events")).unwrap();
    send_toggle(events, Layer::World, true);
    send_toggle(events, 7u32, true);
    send_toggle(events, "7".to_string(), true);
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Seven.Run"]);

    assert_eq!(
        pending::<Layer>(&mut pipeline, Some("events")),
        vec![ToggleRecord::enable(Layer::World)]
    );
    assert_eq!(pending::<String>(&mut pipeline, Some("events")).len(), 1);
    assert!(pending::<u32>(&mut pipeline, Some("events")).is_empty());
}

// =============================================================================
// Lifecycle order
// =============================================================================

#[test]
fn lifecycle_order_forward_then_reverse() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "g",
            true,
            Some("events"),
            vec![
                Probe::boxed("A", ALL, &log),
                Probe::boxed("B", ALL, &log),
                Probe::boxed("C", ALL, &log),
            ],
        )
        .unwrap();

    pipeline.init().unwrap();
    assert_eq!(
        take(&log),
        vec![
            "A.PreInit", "B.PreInit", "C.PreInit", "A.Init", "B.Init", "C.Init"
        ]
    );

    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["A.Run", "B.Run", "C.Run"]);

    pipeline.destroy().unwrap();
    assert_eq!(
        take(&log),
        vec![
            "C.Destroy",
            "B.Destroy",
            "A.Destroy",
            "C.PostDestroy",
            "B.PostDestroy",
            "A.PostDestroy"
        ]
    );
}

#[test]
fn lifecycle_skips_systems_without_the_capability() {
    let log = CallLog::default();
    let init_only = Caps {
        pre_init: false,
        init: true,
        run: false,
        destroy: false,
        post_destroy: false,
    };
    let teardown_only = Caps {
        pre_init: false,
        init: false,
        run: false,
        destroy: true,
        post_destroy: true,
    };
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "g",
            true,
            Some("events"),
            vec![
                Probe::boxed("A", init_only, &log),
                Probe::boxed("B", RUN_ONLY, &log),
                Probe::boxed("C", teardown_only, &log),
            ],
        )
        .unwrap();

    pipeline.init().unwrap();
    pipeline.run().unwrap();
    pipeline.destroy().unwrap();
    assert_eq!(
        take(&log),
        vec!["A.Init", "B.Run", "C.Destroy", "C.PostDestroy"]
    );
}

#[test]
fn disabled_group_still_cascades_init_and_teardown() {
    let log = CallLog::default();
    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "g",
            false,
            Some("events"),
            vec![Probe::boxed("A", ALL, &log)],
        )
        .unwrap();

    pipeline.init().unwrap();
    pipeline.run().unwrap();
    pipeline.destroy().unwrap();
    assert_eq!(
        take(&log),
        vec!["A.PreInit", "A.Init", "A.Destroy", "A.PostDestroy"]
    );
}

#[test]
fn torn_down_group_ignores_runs_and_records() {
    let log = CallLog::default();
    let mut worlds = Worlds::default();
    worlds.insert("events", World::new()).unwrap();
    let mut group = GroupSystem::new(
        "render",
        false,
        Some("events"),
        vec![Probe::boxed("Draw", ALL, &log)],
    )
    .unwrap();

    group.pre_init(&mut worlds).unwrap();
    group.init(&mut worlds).unwrap();
    group.destroy(&mut worlds).unwrap();
    take(&log);
    assert!(group.is_torn_down());

    let record = send_toggle(worlds.world_mut(Some("events")).unwrap(), "render", true);
    group.run(&mut worlds).unwrap();

    assert!(take(&log).is_empty());
    assert!(!group.is_active());
    assert!(
        worlds
            .world(Some("events"))
            .unwrap()
            .get::<ToggleRecord<&'static str>>(record)
            .is_some()
    );
}

#[test]
fn direct_drive_reports_state_changes() {
    let log = CallLog::default();
    let mut worlds = Worlds::default();
    let mut group =
        GroupSystem::new("render", false, None, vec![Probe::boxed("Draw", RUN_ONLY, &log)])
            .unwrap();
    group.pre_init(&mut worlds).unwrap();

    send_toggle(worlds.default_world_mut(), "render", true);
    group.run(&mut worlds).unwrap();
    assert!(group.is_active());

    send_toggle(worlds.default_world_mut(), "render", false);
    group.run(&mut worlds).unwrap();
    assert!(!group.is_active());
    assert_eq!(take(&log), vec!["Draw.Run"]);
}

// =============================================================================
// Nesting
// =============================================================================

#[test]
fn nested_group_only_drains_while_parent_is_active() {
    let log = CallLog::default();
    let inner = GroupSystem::new(
        "inner".to_string(),
        false,
        Some("events"),
        vec![Probe::boxed("Inner", RUN_ONLY, &log)],
    )
    .unwrap();

    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "outer",
            false,
            Some("events"),
            vec![Probe::boxed("Outer", RUN_ONLY, &log), Box::new(inner)],
        )
        .unwrap();
    pipeline.init().unwrap();

    send(&mut pipeline, "inner", true);
    pipeline.run().unwrap();
    assert!(take(&log).is_empty());
    assert_eq!(
        pending::<String>(&mut pipeline, Some("events")).len(),
        1,
        "inner record must wait for outer to cascade"
    );

    send(&mut pipeline, "outer", true);
    pipeline.run().unwrap();
    assert_eq!(take(&log), vec!["Outer.Run", "Inner.Run"]);
    assert!(pending::<String>(&mut pipeline, Some("events")).is_empty());
}

#[test]
fn nested_group_teardown_runs_inside_parent_reverse_order() {
    let log = CallLog::default();
    let inner = GroupSystem::new(
        "inner",
        true,
        Some("events"),
        vec![Probe::boxed("X", ALL, &log), Probe::boxed("Y", ALL, &log)],
    )
    .unwrap();

    let mut pipeline = make_pipeline();
    pipeline
        .add_named_group(
            "outer",
            true,
            Some("events"),
            vec![Probe::boxed("A", ALL, &log), Box::new(inner)],
        )
        .unwrap();
    pipeline.init().unwrap();
    take(&log);

    pipeline.destroy().unwrap();
    assert_eq!(
        take(&log),
        vec![
            "Y.Destroy",
            "X.Destroy",
            "A.Destroy",
            "Y.PostDestroy",
            "X.PostDestroy",
            "A.PostDestroy"
        ]
    );
}
