//! A minimal turn-based numeric picking game exercising the core end to
//! end. Shaped like tic-tac-toe: nine slots, two seats, pick-a-slot turns,
//! without pretending to implement general tabletop rules; grounded on
//! `core/turn_based_game.py` (turn counter,
//! current-agent-by-index) and `examples/tic_tac_toe/tic_tac_toe.py`
//! (board, row/column/diagonal win check).

use std::sync::Mutex;

use serde_json::json;

use crate::core::agent::{Agent, SlotAnswer};
use crate::core::game_logic::GameLogic;
use crate::core::server::GameFactory;
use crate::core::session::SeatId;

const BOARD_SIZE: usize = 9;
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

pub struct TicTacToe {
    board: Mutex<[Option<SeatId>; BOARD_SIZE]>,
    agents: Mutex<Option<Vec<Box<dyn Agent>>>>,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self {
            board: Mutex::new([None; BOARD_SIZE]),
            agents: Mutex::new(None),
        }
    }
}

impl TicTacToe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry factory for `Server::create_room` (the demo game ignores
    /// its construction arguments).
    pub fn factory() -> GameFactory {
        std::sync::Arc::new(|_args: &serde_json::Value| {
            Ok(std::sync::Arc::new(TicTacToe::new()) as std::sync::Arc<dyn GameLogic>)
        })
    }

    fn mark(seat: SeatId) -> &'static str {
        if seat == 0 { "X" } else { "O" }
    }

    fn winner(board: &[Option<SeatId>; BOARD_SIZE]) -> Option<SeatId> {
        LINES.iter().find_map(|line| {
            let first = board[line[0]]?;
            if line.iter().all(|&i| board[i] == Some(first)) {
                Some(first)
            } else {
                None
            }
        })
    }

    fn tell_all(&self, message: &str) {
        if let Some(agents) = self.agents.lock().unwrap().as_ref() {
            for agent in agents {
                agent.tell(message);
            }
        }
    }
}

impl GameLogic for TicTacToe {
    fn seat_count(&self) -> usize {
        2
    }

    fn set_agents(&self, agents: Vec<Box<dyn Agent>>) {
        assert_eq!(agents.len(), 2);
        *self.agents.lock().unwrap() = Some(agents);
    }

    fn play(&self) {
        let mut turn = 0usize;
        loop {
            let empties: Vec<usize> = {
                let board = self.board.lock().unwrap();
                (0..BOARD_SIZE).filter(|&i| board[i].is_none()).collect()
            };
            if empties.is_empty() {
                self.tell_all("It's a draw!");
                return;
            }

            let current_seat = (turn % 2) as SeatId;
            let slots: Vec<String> = empties.iter().map(|i| format!("/cell/{i}")).collect();
            let answer = {
                let agents = self.agents.lock().unwrap();
                let agent = &agents.as_ref().expect("set_agents not called")[current_seat as usize];
                agent.slot_choice(&slots, &empties, &[])
            };

            let cell = match answer {
                Ok(SlotAnswer::Index(cell)) => cell,
                Ok(SlotAnswer::Special(_)) => unreachable!("no special options offered"),
                // Reconnect timeout or terminal disconnect: forfeit to the
                // other seat.
                Err(_) => {
                    let winner = 1 - current_seat;
                    self.tell_all(&format!("seat {winner} wins by forfeit"));
                    return;
                }
            };

            {
                let mut board = self.board.lock().unwrap();
                board[cell] = Some(current_seat);
            }

            let diff = json!({"id": format!("cell-{cell}"), "newHTML": Self::mark(current_seat)});
            if let Some(agents) = self.agents.lock().unwrap().as_ref() {
                for agent in agents {
                    agent.update(vec![diff.clone()]);
                }
            }

            let board_snapshot = *self.board.lock().unwrap();
            if let Some(winner) = Self::winner(&board_snapshot) {
                self.tell_all(&format!("seat {winner} wins!"));
                return;
            }

            turn += 1;
        }
    }

    fn render_view(&self, _viewer_id: Option<SeatId>) -> String {
        let board = self.board.lock().unwrap();
        let mut html = String::from(r#"<table class="tic-tac-toe">"#);
        for row in 0..3 {
            html.push_str("<tr>");
            for col in 0..3 {
                let idx = row * 3 + col;
                let mark = board[idx].map(Self::mark).unwrap_or("");
                html.push_str(&format!(r#"<td id="cell-{idx}">{mark}</td>"#));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::LocalAgent;
    use std::sync::Arc;

    #[test]
    fn scripted_game_ends_with_a_winner() {
        let game = TicTacToe::new();
        // seat 0 (X) takes the top row 0,1,2; seat 1 (O) plays elsewhere.
        let alice = Arc::new(LocalAgent::new(
            "alice",
            vec!["/cell/0".into(), "/cell/1".into(), "/cell/2".into()],
        ));
        let bob = Arc::new(LocalAgent::new(
            "bob",
            vec!["/cell/3".into(), "/cell/4".into()],
        ));
        game.set_agents(vec![
            Box::new(LocalAgentHandle(alice.clone())),
            Box::new(LocalAgentHandle(bob.clone())),
        ]);
        game.play();

        assert!(
            alice
                .told_messages()
                .iter()
                .any(|m| m.contains("seat 0 wins"))
        );
    }

    /// Adapts `Arc<LocalAgent>` to `Box<dyn Agent>` for the test above.
    struct LocalAgentHandle(Arc<LocalAgent>);

    impl Agent for LocalAgentHandle {
        fn name(&self) -> &str {
            self.0.name()
        }
        fn tell(&self, message: &str) {
            self.0.tell(message)
        }
        fn update(&self, diffs: Vec<crate::core::agent::ViewDiff>) {
            self.0.update(diffs)
        }
        fn int_choice(
            &self,
            min: Option<i64>,
            max: Option<i64>,
        ) -> Result<i64, crate::core::errors::AskError> {
            self.0.int_choice(min, max)
        }
        fn text_choice(&self, options: &[String]) -> Result<String, crate::core::errors::AskError> {
            self.0.text_choice(options)
        }
        fn slot_choice(
            &self,
            slots: &[String],
            indices: &[usize],
            specials: &[String],
        ) -> Result<SlotAnswer, crate::core::errors::AskError> {
            self.0.slot_choice(slots, indices, specials)
        }
    }
}
