#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure builder system that turns pointer input into build, select and
//! upgrade commands.

use lane_defence_core::{
    BuildError, CellCoord, Command, Event, GameStatus, ParticipantId, TowerId, TowerKind,
    UpgradeError,
};

/// Declarative preview describing a potential tower construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildPreview {
    /// Kind of tower proposed for construction.
    pub kind: TowerKind,
    /// Cell the tower would occupy.
    pub cell: CellCoord,
    /// Cost debited on success, or the reason the build would be refused.
    pub outcome: Result<u64, BuildError>,
}

impl BuildPreview {
    /// Creates a new build preview descriptor.
    #[must_use]
    pub const fn new(kind: TowerKind, cell: CellCoord, outcome: Result<u64, BuildError>) -> Self {
        Self {
            kind,
            cell,
            outcome,
        }
    }

    /// Reports whether confirming the preview would build a tower.
    #[must_use]
    pub const fn placeable(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Preview of upgrading the selected tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpgradePreview {
    /// Tower that would be upgraded.
    pub tower: TowerId,
    /// Cost debited on success, or the reason the upgrade would be refused.
    pub outcome: Result<u64, UpgradeError>,
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Indicates whether the player clicked the hovered cell on this frame.
    pub confirm_action: bool,
    /// Indicates whether the player requested an upgrade of the selected tower.
    pub upgrade_action: bool,
    /// Cell currently hovered by the cursor.
    pub cursor_cell: Option<CellCoord>,
}

impl BuilderInput {
    /// Creates a new input descriptor with explicit field values.
    #[must_use]
    pub const fn new(
        confirm_action: bool,
        upgrade_action: bool,
        cursor_cell: Option<CellCoord>,
    ) -> Self {
        Self {
            confirm_action,
            upgrade_action,
            cursor_cell,
        }
    }
}

/// Builder system that translates previews and input into world commands.
#[derive(Debug, Clone)]
pub struct Builder {
    participant: ParticipantId,
    armed: TowerKind,
    selected: Option<TowerId>,
    status: GameStatus,
}

impl Builder {
    /// Creates a builder acting on behalf of `participant` with the basic tower armed.
    #[must_use]
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            armed: TowerKind::Basic,
            selected: None,
            status: GameStatus::Waiting,
        }
    }

    /// Chooses the tower kind placed by the next confirmed click.
    pub fn arm(&mut self, kind: TowerKind) {
        self.armed = kind;
    }

    /// Tower kind placed by the next confirmed click.
    #[must_use]
    pub const fn armed(&self) -> TowerKind {
        self.armed
    }

    /// Participant the builder acts for.
    #[must_use]
    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Tower selected according to the most recent selection event.
    #[must_use]
    pub const fn selected(&self) -> Option<TowerId> {
        self.selected
    }

    /// Previews building the armed tower on `cell`.
    ///
    /// The `check` closure should mirror the world's `query::build_preview`.
    pub fn preview_build<F>(&self, cell: CellCoord, check: F) -> BuildPreview
    where
        F: FnOnce(CellCoord, TowerKind) -> Result<u64, BuildError>,
    {
        BuildPreview::new(self.armed, cell, check(cell, self.armed))
    }

    /// Previews upgrading the selected tower, if any.
    ///
    /// The `check` closure should mirror the world's `query::upgrade_preview`.
    pub fn preview_upgrade<F>(&self, check: F) -> Option<UpgradePreview>
    where
        F: FnOnce(TowerId) -> Result<u64, UpgradeError>,
    {
        self.selected.map(|tower| UpgradePreview {
            tower,
            outcome: check(tower),
        })
    }

    /// Consumes world events and adapter-derived input to emit builder commands.
    ///
    /// A click on an occupied cell selects its tower. A click on a free cell
    /// builds the armed tower when the preview allows it and otherwise clears
    /// the selection. The `tower_at` closure should mirror the semantics of
    /// the world's `query::tower_at` helper.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        preview: Option<BuildPreview>,
        input: BuilderInput,
        mut tower_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(CellCoord) -> Option<TowerId>,
    {
        for event in events {
            match event {
                Event::SelectionChanged { tower } => self.selected = *tower,
                Event::StatusChanged { to, .. } => self.status = *to,
                Event::GameReset => self.selected = None,
                _ => {}
            }
        }

        if self.status.is_game_over() {
            return;
        }

        if input.confirm_action {
            if let Some(cell) = input.cursor_cell {
                let buildable = preview
                    .filter(|preview| preview.cell == cell && preview.placeable())
                    .map(|preview| preview.kind);
                match (tower_at(cell), buildable) {
                    (None, Some(kind)) => out.push(Command::BuildTower {
                        participant: self.participant.clone(),
                        kind,
                        cell,
                    }),
                    _ => out.push(Command::SelectCell { cell }),
                }
            }
        }

        if input.upgrade_action {
            if let Some(tower) = self.selected {
                out.push(Command::UpgradeTower { tower });
            }
        }
    }
}
