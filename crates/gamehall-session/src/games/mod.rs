//! Engines that ship with Gamehall.

mod tic_tac_toe;

pub use tic_tac_toe::{Mark, TicTacToe, TicTacToeAction, TicTacToeState};
