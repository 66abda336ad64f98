//! 井字棋核心逻辑（棋盘判定、单局状态机、设置与对局记录）。

pub mod board;
pub mod record;
pub mod session;
pub mod settings;

pub use board::{evaluate, legal_moves, Board, Mark, Outcome, BOARD_CELLS, WINNING_LINES};
pub use record::{GameRecord, GameStats};
pub use session::{
    GameEvent, GameSession, MoveResolution, SessionPhase, COMPUTER_MARK, HUMAN_MARK,
};
pub use settings::{
    GameSettings, PlayerStats, SettingsError, COMPUTER_NAME, SETTINGS_STORAGE_KEY,
};
