//! Demo `GameLogic` implementations exercising the core end to end.

pub mod tic_tac_toe;

pub use tic_tac_toe::TicTacToe;
