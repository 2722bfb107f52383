//! Two-player tic-tac-toe, the reference [`Engine`].
//!
//! The first player in join order plays `X` and moves first.

use gamehall_protocol::ClientId;
use serde::{Deserialize, Serialize};

use crate::{Engine, SessionError};

const PLAYERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

type Board = [[Option<Mark>; 3]; 3];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicTacToeState {
    pub board: Board,
    /// `players[0]` plays X, `players[1]` plays O.
    pub players: [ClientId; 2],
    pub current_turn: ClientId,
    pub winner: Option<ClientId>,
    pub draw: bool,
}

impl TicTacToeState {
    fn fresh(players: [ClientId; 2]) -> Self {
        Self {
            board: [[None; 3]; 3],
            current_turn: players[0].clone(),
            players,
            winner: None,
            draw: false,
        }
    }

    fn is_over(&self) -> bool {
        self.winner.is_some() || self.draw
    }

    fn mark_of(&self, player: &ClientId) -> Mark {
        if *player == self.players[0] { Mark::X } else { Mark::O }
    }

    fn other(&self, player: &ClientId) -> &ClientId {
        if *player == self.players[0] {
            &self.players[1]
        } else {
            &self.players[0]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TicTacToeAction {
    /// Signed so that negative coordinates parse and get a proper
    /// "out of bounds" rejection instead of a malformed-action error.
    Move { row: i32, col: i32 },
    Restart,
}

pub struct TicTacToe;

impl Engine for TicTacToe {
    const GAME_TYPE: &'static str = "tictactoe";

    type State = TicTacToeState;
    type Action = TicTacToeAction;

    fn init(players: &[ClientId]) -> Result<TicTacToeState, SessionError> {
        match players {
            [x, o] => Ok(TicTacToeState::fresh([x.clone(), o.clone()])),
            _ => Err(SessionError::InvalidPlayerCount {
                game_type: Self::GAME_TYPE.to_string(),
                expected: PLAYERS,
                actual: players.len(),
            }),
        }
    }

    fn validate(
        state: &TicTacToeState,
        actor: &ClientId,
        action: &TicTacToeAction,
    ) -> Result<(), String> {
        let TicTacToeAction::Move { row, col } = *action else {
            return Ok(());
        };
        if state.is_over() {
            return Err("Game is already over".into());
        }
        if state.current_turn != *actor {
            return Err("Not your turn".into());
        }
        let Some((r, c)) = cell(row, col) else {
            return Err("Move is out of bounds".into());
        };
        if state.board[r][c].is_some() {
            return Err("Cell is already occupied".into());
        }
        Ok(())
    }

    fn apply(state: &TicTacToeState, actor: &ClientId, action: TicTacToeAction) -> TicTacToeState {
        let (row, col) = match action {
            TicTacToeAction::Restart => return TicTacToeState::fresh(state.players.clone()),
            TicTacToeAction::Move { row, col } => match cell(row, col) {
                Some(rc) => rc,
                None => return state.clone(),
            },
        };

        let mut next = state.clone();
        let mark = next.mark_of(actor);
        next.board[row][col] = Some(mark);

        if check_winner(&next.board, mark) {
            next.winner = Some(actor.clone());
        } else if board_full(&next.board) {
            next.draw = true;
        } else {
            next.current_turn = next.other(actor).clone();
        }
        next
    }

    fn is_terminal(state: &TicTacToeState) -> bool {
        state.is_over()
    }

    fn winner(state: &TicTacToeState) -> Option<ClientId> {
        state.winner.clone()
    }
}

fn cell(row: i32, col: i32) -> Option<(usize, usize)> {
    let in_range = |v: i32| (0..3).contains(&v);
    (in_range(row) && in_range(col)).then(|| (row as usize, col as usize))
}

fn check_winner(b: &Board, m: Mark) -> bool {
    let is = |i: usize, j: usize| b[i][j] == Some(m);
    (0..3).any(|i| (0..3).all(|j| is(i, j)))      // rows
        || (0..3).any(|j| (0..3).all(|i| is(i, j))) // cols
        || (0..3).all(|i| is(i, i))                 // diagonal
        || (0..3).all(|i| is(i, 2 - i))             // anti-diagonal
}

fn board_full(b: &Board) -> bool {
    b.iter().all(|row| row.iter().all(Option::is_some))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn a() -> ClientId {
        ClientId::new("a")
    }

    fn b() -> ClientId {
        ClientId::new("b")
    }

    fn new_game() -> TicTacToeState {
        TicTacToe::init(&[a(), b()]).unwrap()
    }

    fn mv(row: i32, col: i32) -> TicTacToeAction {
        TicTacToeAction::Move { row, col }
    }

    /// Validates and applies a sequence of (player, row, col) moves.
    fn play(moves: &[(ClientId, i32, i32)]) -> TicTacToeState {
        let mut state = new_game();
        for (who, row, col) in moves {
            TicTacToe::validate(&state, who, &mv(*row, *col)).unwrap();
            state = TicTacToe::apply(&state, who, mv(*row, *col));
        }
        state
    }

    fn cells_set(state: &TicTacToeState) -> usize {
        state.board.iter().flatten().filter(|c| c.is_some()).count()
    }

    #[test]
    fn test_init_empty_board_first_player_to_move() {
        let state = new_game();
        assert_eq!(cells_set(&state), 0);
        assert_eq!(state.current_turn, a());
        assert_eq!(state.players, [a(), b()]);
        assert!(!TicTacToe::is_terminal(&state));
        assert_eq!(TicTacToe::winner(&state), None);
    }

    #[test]
    fn test_init_rejects_wrong_player_count() {
        for players in [vec![], vec![a()], vec![a(), b(), ClientId::new("c")]] {
            let err = TicTacToe::init(&players).unwrap_err();
            assert!(matches!(
                err,
                SessionError::InvalidPlayerCount { expected: 2, actual, .. } if actual == players.len()
            ));
        }
    }

    #[test]
    fn test_legal_move_sets_one_cell_and_flips_turn() {
        let state = play(&[(a(), 0, 0)]);
        assert_eq!(state.board[0][0], Some(Mark::X));
        assert_eq!(cells_set(&state), 1);
        assert_eq!(state.current_turn, b());

        let state = TicTacToe::apply(&state, &b(), mv(2, 1));
        assert_eq!(state.board[2][1], Some(Mark::O));
        assert_eq!(cells_set(&state), 2);
        assert_eq!(state.current_turn, a());
    }

    #[test]
    fn test_move_out_of_turn_rejected() {
        let state = new_game();
        let err = TicTacToe::validate(&state, &b(), &mv(0, 0)).unwrap_err();
        assert_eq!(err, "Not your turn");
    }

    #[test]
    fn test_move_by_non_player_rejected() {
        let state = new_game();
        let err = TicTacToe::validate(&state, &ClientId::new("z"), &mv(0, 0)).unwrap_err();
        assert_eq!(err, "Not your turn");
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let state = new_game();
        for (row, col) in [(-1, 0), (0, 3), (3, 3), (0, -7)] {
            let err = TicTacToe::validate(&state, &a(), &mv(row, col)).unwrap_err();
            assert_eq!(err, "Move is out of bounds");
        }
    }

    #[test]
    fn test_occupied_cell_rejected() {
        let state = play(&[(a(), 1, 1)]);
        let err = TicTacToe::validate(&state, &b(), &mv(1, 1)).unwrap_err();
        assert_eq!(err, "Cell is already occupied");
    }

    #[test]
    fn test_top_row_wins() {
        let state = play(&[(a(), 0, 0), (b(), 1, 0), (a(), 0, 1), (b(), 1, 1), (a(), 0, 2)]);
        assert!(TicTacToe::is_terminal(&state));
        assert_eq!(TicTacToe::winner(&state), Some(a()));
        assert!(!state.draw);
        // The turn stays with the winner once the game is over.
        assert_eq!(state.current_turn, a());
    }

    #[test]
    fn test_column_wins_for_second_player() {
        let state = play(&[
            (a(), 0, 0),
            (b(), 0, 2),
            (a(), 1, 0),
            (b(), 1, 2),
            (a(), 2, 1),
            (b(), 2, 2),
        ]);
        assert_eq!(TicTacToe::winner(&state), Some(b()));
    }

    #[test]
    fn test_diagonals_win() {
        let diag = play(&[(a(), 0, 0), (b(), 0, 1), (a(), 1, 1), (b(), 0, 2), (a(), 2, 2)]);
        assert_eq!(TicTacToe::winner(&diag), Some(a()));

        let anti = play(&[(a(), 0, 2), (b(), 0, 0), (a(), 1, 1), (b(), 0, 1), (a(), 2, 0)]);
        assert_eq!(TicTacToe::winner(&anti), Some(a()));
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        // X O X
        // X O O
        // O X X
        let state = play(&[
            (a(), 0, 0),
            (b(), 0, 1),
            (a(), 0, 2),
            (b(), 1, 1),
            (a(), 1, 0),
            (b(), 1, 2),
            (a(), 2, 1),
            (b(), 2, 0),
            (a(), 2, 2),
        ]);
        assert!(TicTacToe::is_terminal(&state));
        assert!(state.draw);
        assert_eq!(TicTacToe::winner(&state), None);
    }

    #[test]
    fn test_move_after_game_over_rejected_first() {
        let state = play(&[(a(), 0, 0), (b(), 1, 0), (a(), 0, 1), (b(), 1, 1), (a(), 0, 2)]);
        // Over, out of turn, and out of bounds all at once: "over" wins.
        let err = TicTacToe::validate(&state, &b(), &mv(9, 9)).unwrap_err();
        assert_eq!(err, "Game is already over");
    }

    #[test]
    fn test_restart_always_valid_and_resets() {
        let state = play(&[(a(), 0, 0), (b(), 1, 0), (a(), 0, 1), (b(), 1, 1), (a(), 0, 2)]);
        assert!(TicTacToe::validate(&state, &b(), &TicTacToeAction::Restart).is_ok());

        let restarted = TicTacToe::apply(&state, &b(), TicTacToeAction::Restart);
        assert_eq!(restarted, new_game());
    }

    #[test]
    fn test_state_json_format() {
        let state = play(&[(a(), 0, 1)]);
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({
                "board": [[null, "X", null], [null, null, null], [null, null, null]],
                "players": ["a", "b"],
                "currentTurn": "b",
                "winner": null,
                "draw": false
            })
        );
    }

    #[test]
    fn test_action_json_format() {
        let action: TicTacToeAction =
            serde_json::from_value(json!({"type": "move", "row": 0, "col": 2})).unwrap();
        assert_eq!(action, mv(0, 2));

        let action: TicTacToeAction = serde_json::from_value(json!({"type": "restart"})).unwrap();
        assert_eq!(action, TicTacToeAction::Restart);
    }
}
