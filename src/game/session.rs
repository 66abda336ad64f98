use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::{evaluate, Board, Mark, Outcome};
use super::settings::GameSettings;
use crate::ai::{select_move, AiDecision, Difficulty, OpponentConfig};

/// 人类玩家（对电脑时）固定执 X，电脑固定执 O。
pub const HUMAN_MARK: Mark = Mark::X;
pub const COMPUTER_MARK: Mark = Mark::O;

/// 对电脑时电脑先手的概率。
const COMPUTER_FIRST_CHANCE: f64 = 0.5;

/// 单局状态，由棋盘与下一手推导，不单独存储。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SessionPhase {
    AwaitingPlayerMove { mark: Mark },
    AwaitingOpponentMove,
    Concluded { outcome: Outcome },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MovePlayed {
        mark: Mark,
        index: usize,
        #[serde(default)]
        by_computer: bool,
    },
    GameWon {
        winner: Mark,
    },
    GameDrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveResolution {
    pub board: Board,
    pub events: Vec<GameEvent>,
    pub outcome: Outcome,
    pub phase: SessionPhase,
}

impl MoveResolution {
    fn new(session: &GameSession, mut events: Vec<GameEvent>) -> Self {
        let outcome = session.outcome();
        match outcome {
            Outcome::Won { winner } => events.push(GameEvent::GameWon { winner }),
            Outcome::Draw => events.push(GameEvent::GameDrawn),
            Outcome::InProgress => {}
        }
        Self {
            board: session.board,
            events,
            outcome,
            phase: session.phase(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    board: Board,
    next: Mark,
    vs_computer: bool,
    #[serde(default)]
    difficulty: Difficulty,
}

impl GameSession {
    pub fn new(vs_computer: bool, difficulty: Difficulty) -> Self {
        Self {
            board: Board::new(),
            next: Mark::X,
            vs_computer,
            difficulty,
        }
    }

    pub fn from_settings(settings: &GameSettings) -> Self {
        Self::new(settings.vs_computer, settings.difficulty)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn next(&self) -> Mark {
        self.next
    }

    pub fn vs_computer(&self) -> bool {
        self.vs_computer
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn opponent_config(&self) -> OpponentConfig {
        OpponentConfig::from_difficulty(self.difficulty)
    }

    pub fn outcome(&self) -> Outcome {
        evaluate(&self.board)
    }

    pub fn phase(&self) -> SessionPhase {
        let outcome = self.outcome();
        if outcome.is_concluded() {
            SessionPhase::Concluded { outcome }
        } else if self.vs_computer && self.next == COMPUTER_MARK {
            SessionPhase::AwaitingOpponentMove
        } else {
            SessionPhase::AwaitingPlayerMove { mark: self.next }
        }
    }

    /// 开新局。对电脑时抛硬币决定谁先手，双人对战总是 X 先手。
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SessionPhase {
        self.board.clear();
        self.next = if self.vs_computer && rng.gen::<f64>() < COMPUTER_FIRST_CHANCE {
            COMPUTER_MARK
        } else {
            Mark::X
        };
        self.phase()
    }

    /// 外部重置：清空棋盘，X 先手。
    pub fn reset(&mut self) -> SessionPhase {
        self.board.clear();
        self.next = Mark::X;
        self.phase()
    }

    /// 切换难度会重新开局。
    pub fn change_difficulty<R: Rng + ?Sized>(
        &mut self,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> SessionPhase {
        self.difficulty = difficulty;
        self.start(rng)
    }

    /// 玩家落子。非玩家回合或格子非法时为空操作，返回 `None`。
    pub fn play(&mut self, index: usize) -> Option<MoveResolution> {
        match self.phase() {
            SessionPhase::AwaitingPlayerMove { .. } => self.apply(index, false),
            _ => None,
        }
    }

    /// 应用电脑选好的落子，仅在等待电脑时生效。
    pub fn apply_opponent_move(&mut self, index: usize) -> Option<MoveResolution> {
        match self.phase() {
            SessionPhase::AwaitingOpponentMove => self.apply(index, true),
            _ => None,
        }
    }

    pub fn play_opponent<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Option<(AiDecision, MoveResolution)> {
        if self.phase() != SessionPhase::AwaitingOpponentMove {
            return None;
        }
        let decision = select_move(&self.board, COMPUTER_MARK, &self.opponent_config(), rng).ok()?;
        let resolution = self.apply_opponent_move(decision.index)?;
        Some((decision, resolution))
    }

    fn apply(&mut self, index: usize, by_computer: bool) -> Option<MoveResolution> {
        let mark = self.next;
        if !self.board.place(index, mark) {
            return None;
        }
        self.next = mark.opponent();
        let events = vec![GameEvent::MovePlayed {
            mark,
            index,
            by_computer,
        }];
        Some(MoveResolution::new(self, events))
    }
}

impl Default for GameSession {
    fn default() -> Self {
        GameSession::new(false, Difficulty::default())
    }
}
