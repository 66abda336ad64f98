//! 电脑对手：极小化极大搜索与按难度分级的出招策略。

pub mod minimax;

pub use minimax::{
    minimax, rank_moves, select_move, AiDecision, AiError, DecisionPolicy, Difficulty,
    OpponentAgent, OpponentConfig, ScoredMove, SearchResult, SearchStats, WIN_SCORE,
};
