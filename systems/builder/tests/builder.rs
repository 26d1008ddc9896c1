use lane_defence_core::{
    BuildError, CellCoord, Command, Event, GameStatus, ParticipantId, TowerId, TowerKind,
    UpgradeError,
};
use lane_defence_system_builder::{BuildPreview, Builder, BuilderInput};
use lane_defence_world::{self as world, query, World};

fn participant() -> ParticipantId {
    ParticipantId::new("ana")
}

fn click(cell: CellCoord) -> BuilderInput {
    BuilderInput {
        confirm_action: true,
        cursor_cell: Some(cell),
        ..BuilderInput::default()
    }
}

#[test]
fn confirm_on_free_cell_emits_build_command() {
    let mut builder = Builder::new(participant());
    builder.arm(TowerKind::Fast);
    let cell = CellCoord::new(2, 2);
    let preview = builder.preview_build(cell, |_, kind| Ok(kind.cost()));
    let mut commands = Vec::new();

    builder.handle(&[], Some(preview), click(cell), |_| None, &mut commands);

    assert_eq!(
        commands,
        vec![Command::BuildTower {
            participant: participant(),
            kind: TowerKind::Fast,
            cell,
        }],
        "builder should emit a build command when confirming a valid preview",
    );
}

#[test]
fn confirm_on_unbuildable_cell_clears_selection_instead() {
    let mut builder = Builder::new(participant());
    let cell = CellCoord::new(0, 3);
    let preview = BuildPreview::new(TowerKind::Basic, cell, Err(BuildError::PathCell));
    let mut commands = Vec::new();

    builder.handle(&[], Some(preview), click(cell), |_| None, &mut commands);

    assert_eq!(commands, vec![Command::SelectCell { cell }]);
}

#[test]
fn preview_for_another_cell_is_not_trusted() {
    let mut builder = Builder::new(participant());
    let preview = BuildPreview::new(TowerKind::Basic, CellCoord::new(1, 1), Ok(25));
    let clicked = CellCoord::new(4, 4);
    let mut commands = Vec::new();

    builder.handle(&[], Some(preview), click(clicked), |_| None, &mut commands);

    assert_eq!(commands, vec![Command::SelectCell { cell: clicked }]);
}

#[test]
fn confirm_on_tower_selects_it() {
    let mut builder = Builder::new(participant());
    let cell = CellCoord::new(2, 2);
    let mut looked_up = None;
    let mut commands = Vec::new();

    builder.handle(
        &[],
        Some(BuildPreview::new(
            TowerKind::Basic,
            cell,
            Err(BuildError::Occupied),
        )),
        click(cell),
        |hovered| {
            looked_up = Some(hovered);
            Some(TowerId::new(7))
        },
        &mut commands,
    );

    assert_eq!(looked_up, Some(cell));
    assert_eq!(commands, vec![Command::SelectCell { cell }]);
}

#[test]
fn upgrade_targets_the_selected_tower() {
    let mut builder = Builder::new(participant());
    let tower = TowerId::new(3);
    let mut commands = Vec::new();
    let upgrade = BuilderInput {
        upgrade_action: true,
        ..BuilderInput::default()
    };

    builder.handle(&[], None, upgrade, |_| None, &mut commands);
    assert!(commands.is_empty(), "nothing selected, nothing to upgrade");

    builder.handle(
        &[Event::SelectionChanged { tower: Some(tower) }],
        None,
        upgrade,
        |_| None,
        &mut commands,
    );
    assert_eq!(commands, vec![Command::UpgradeTower { tower }]);

    let preview = builder
        .preview_upgrade(|_| {
            Err(UpgradeError::InsufficientFunds {
                required: 20,
                available: 5,
            })
        })
        .expect("selected tower preview");
    assert_eq!(preview.tower, tower);
    assert!(preview.outcome.is_err());
}

#[test]
fn input_ignored_once_the_game_is_over() {
    let mut builder = Builder::new(participant());
    let cell = CellCoord::new(2, 2);
    let mut commands = Vec::new();

    builder.handle(
        &[Event::StatusChanged {
            from: GameStatus::InProgress,
            to: GameStatus::GameOverLoss,
        }],
        Some(BuildPreview::new(TowerKind::Basic, cell, Ok(25))),
        click(cell),
        |_| None,
        &mut commands,
    );

    assert!(
        commands.is_empty(),
        "system must not emit commands after the match ended",
    );
}

#[test]
fn builder_drives_world_build_and_select() {
    let mut world = World::new();
    let mut builder = Builder::new(participant());
    let cell = CellCoord::new(1, 1);
    let mut events = Vec::new();

    for _ in 0..2 {
        let preview = builder.preview_build(cell, |cell, kind| {
            query::build_preview(&world, cell, kind)
        });
        let mut commands = Vec::new();
        builder.handle(
            &events,
            Some(preview),
            click(cell),
            |cell| query::tower_at(&world, cell),
            &mut commands,
        );
        events.clear();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
    }

    let tower = query::tower_at(&world, cell).expect("tower built");
    assert_eq!(query::towers(&world).count(), 1);
    assert_eq!(
        query::selected_tower(&world).map(|selected| selected.id),
        Some(tower)
    );
    assert_eq!(query::ledger(&world).resources, 75);
}
