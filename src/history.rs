use crate::error::RouteError;
use crate::route::{RouteState, Snapshot};
use crate::waypoint::{Waypoint, WaypointId};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_DEPTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandKind {
    Append { latitude: f64, longitude: f64 },
    Clear,
    Invert,
}

// A mutation that ran, with the full list as it was before.
#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    before: Snapshot,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn before(&self) -> &[Waypoint] {
        &self.before
    }
}

#[derive(Debug, Clone)]
struct Undone {
    kind: CommandKind,
    before: Snapshot,
    after: Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    Appended(WaypointId),
    Cleared,
    Inverted,
}

// Both stacks are bounded and drop their oldest entry first. Any new
// mutation discards the redo stack.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    undo: VecDeque<Command>,
    redo: VecDeque<Undone>,
    depth: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl CommandHistory {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            depth: depth.max(1),
        }
    }

    pub fn execute(
        &mut self,
        route: &mut RouteState,
        kind: CommandKind,
    ) -> Result<Applied, RouteError> {
        let before = route.snapshot();
        let applied = match kind {
            CommandKind::Append {
                latitude,
                longitude,
            } => Applied::Appended(route.append(latitude, longitude)?),
            CommandKind::Clear => {
                route.clear();
                Applied::Cleared
            }
            CommandKind::Invert => {
                route.invert();
                Applied::Inverted
            }
        };
        push_bounded(&mut self.undo, Command { kind, before }, self.depth);
        self.redo.clear();
        Ok(applied)
    }

    pub fn undo(&mut self, route: &mut RouteState) -> bool {
        let Some(command) = self.undo.pop_back() else {
            return false;
        };
        let after = route.snapshot();
        route.restore(&command.before);
        push_bounded(
            &mut self.redo,
            Undone {
                kind: command.kind,
                before: command.before,
                after,
            },
            self.depth,
        );
        true
    }

    pub fn redo(&mut self, route: &mut RouteState) -> bool {
        let Some(undone) = self.redo.pop_back() else {
            return false;
        };
        route.restore(&undone.after);
        push_bounded(
            &mut self.undo,
            Command {
                kind: undone.kind,
                before: undone.before,
            },
            self.depth,
        );
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn size(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_size(&self) -> usize {
        self.redo.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn last(&self) -> Option<&Command> {
        self.undo.back()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn push_bounded<T>(stack: &mut VecDeque<T>, item: T, depth: usize) {
    stack.push_back(item);
    while stack.len() > depth {
        stack.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waypoint::Label;

    fn append(history: &mut CommandHistory, route: &mut RouteState, lat: f64, lon: f64) {
        history
            .execute(
                route,
                CommandKind::Append {
                    latitude: lat,
                    longitude: lon,
                },
            )
            .unwrap();
    }

    #[test]
    fn three_appends_then_undo() {
        let mut route = RouteState::with_seed(1);
        let mut history = CommandHistory::default();
        append(&mut history, &mut route, 55.0, 24.0);
        append(&mut history, &mut route, 55.1, 24.1);
        append(&mut history, &mut route, 55.2, 24.2);
        assert_eq!(
            route.labels(),
            vec![Label::Start, Label::Ordinal(1), Label::Finish]
        );
        assert!(history.undo(&mut route));
        assert_eq!(route.labels(), vec![Label::Start, Label::Finish]);
        assert_eq!(route.waypoints()[1].position.latitude, 55.1);
    }

    #[test]
    fn undo_restores_exact_pre_state_for_every_kind() {
        let mut route = RouteState::with_seed(8);
        let mut history = CommandHistory::default();
        for i in 0..4 {
            append(&mut history, &mut route, 54.5 + i as f64 * 0.1, 23.5);
        }
        for kind in [
            CommandKind::Invert,
            CommandKind::Clear,
            CommandKind::Append {
                latitude: 55.5,
                longitude: 25.0,
            },
        ] {
            let before = route.snapshot();
            history.execute(&mut route, kind).unwrap();
            assert!(history.undo(&mut route));
            assert_eq!(route.snapshot(), before);
            for i in 0..route.len() {
                let expected = if i + 1 < route.len() { Some(i + 1) } else { None };
                assert_eq!(route.successor(i), expected);
            }
        }
    }

    #[test]
    fn depth_is_bounded() {
        let mut route = RouteState::with_seed(1);
        let mut history = CommandHistory::default();
        for i in 0..45 {
            append(&mut history, &mut route, 50.0 + i as f64 * 0.01, 20.0);
            assert!(history.size() <= DEFAULT_HISTORY_DEPTH);
        }
        assert_eq!(history.size(), DEFAULT_HISTORY_DEPTH);
        let mut undone = 0;
        while history.undo(&mut route) {
            undone += 1;
        }
        assert_eq!(undone, DEFAULT_HISTORY_DEPTH);
        assert_eq!(route.len(), 45 - DEFAULT_HISTORY_DEPTH);
        assert!(history.redo_size() <= DEFAULT_HISTORY_DEPTH);
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut route = RouteState::with_seed(1);
        let mut history = CommandHistory::default();
        assert!(!history.can_undo());
        assert!(!history.undo(&mut route));
        assert!(!history.redo(&mut route));
        assert!(route.is_empty());
    }

    #[test]
    fn redo_reapplies_the_same_waypoint() {
        let mut route = RouteState::with_seed(1);
        let mut history = CommandHistory::default();
        append(&mut history, &mut route, 55.0, 24.0);
        append(&mut history, &mut route, 55.1, 24.1);
        let after = route.snapshot();
        assert!(history.undo(&mut route));
        assert!(history.can_redo());
        assert!(history.redo(&mut route));
        assert_eq!(route.snapshot(), after);
        assert!(!history.can_redo());
        assert_eq!(history.size(), 2);
    }

    #[test]
    fn new_mutation_clears_redo() {
        let mut route = RouteState::with_seed(1);
        let mut history = CommandHistory::default();
        append(&mut history, &mut route, 55.0, 24.0);
        append(&mut history, &mut route, 55.1, 24.1);
        history.undo(&mut route);
        append(&mut history, &mut route, 56.0, 25.0);
        assert!(!history.can_redo());
        assert!(!history.redo(&mut route));
        assert_eq!(route.len(), 2);
    }

    #[test]
    fn failed_command_is_not_recorded() {
        let mut route = RouteState::with_seed(1);
        let mut history = CommandHistory::default();
        append(&mut history, &mut route, 55.0, 24.0);
        let err = history.execute(
            &mut route,
            CommandKind::Append {
                latitude: 200.0,
                longitude: 0.0,
            },
        );
        assert!(err.is_err());
        assert_eq!(history.size(), 1);
        assert_eq!(route.len(), 1);
    }

    #[test]
    fn clear_drops_both_stacks() {
        let mut route = RouteState::with_seed(1);
        let mut history = CommandHistory::default();
        append(&mut history, &mut route, 55.0, 24.0);
        append(&mut history, &mut route, 55.1, 24.1);
        history.undo(&mut route);
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.last().map(|c| c.kind()), None);
    }
}
