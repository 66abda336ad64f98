use std::fmt;
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{evaluate, legal_moves, Board, Mark, Outcome};

/// 终局评分基准：电脑获胜记 `WIN_SCORE - depth`，落败记 `depth - WIN_SCORE`，平局为 0。
pub const WIN_SCORE: i32 = 10;

/// 搜索展开顺序：中心、四角、四边。同分时靠前的走法胜出。
const SEARCH_ORDER: [usize; 9] = [4, 0, 2, 6, 8, 1, 3, 5, 7];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "fácil", alias = "facil")]
    Easy,
    #[default]
    #[serde(alias = "medio", alias = "normal")]
    Medium,
    #[serde(alias = "difícil", alias = "dificil")]
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "fácil" | "facil" => Ok(Difficulty::Easy),
            "medium" | "normal" | "medio" => Ok(Difficulty::Medium),
            "hard" | "difícil" | "dificil" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 电脑对手的出招策略参数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpponentConfig {
    /// 直接随机落子的概率。
    pub random_move_chance: f64,
    /// 在评分最高的若干走法中随机挑选的概率。
    pub suboptimal_chance: f64,
    pub top_candidates: usize,
}

impl OpponentConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                random_move_chance: 1.0,
                suboptimal_chance: 0.0,
                top_candidates: 2,
            },
            // 非随机分支直接走最优解，不经过 hard 的次优分支
            Difficulty::Medium => Self {
                random_move_chance: 0.5,
                suboptimal_chance: 0.0,
                top_candidates: 2,
            },
            Difficulty::Hard => Self {
                random_move_chance: 0.0,
                suboptimal_chance: 0.2,
                top_candidates: 2,
            },
        }
    }

    pub fn with_random_move_chance(mut self, chance: f64) -> Self {
        self.random_move_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn with_suboptimal_chance(mut self, chance: f64) -> Self {
        self.suboptimal_chance = chance.clamp(0.0, 1.0);
        self
    }
}

impl Default for OpponentConfig {
    fn default() -> Self {
        OpponentConfig::from_difficulty(Difficulty::default())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    Random,
    TopCandidates,
    BestPlay,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub index: usize,
    pub policy: DecisionPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub nodes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum AiError {
    NoLegalMove,
    GameConcluded { outcome: Outcome },
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiError::NoLegalMove => f.write_str("no legal move available"),
            AiError::GameConcluded { outcome } => write!(f, "game already concluded: {outcome:?}"),
        }
    }
}

impl std::error::Error for AiError {}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    pub nodes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub score: i32,
    /// 仅对顶层调用有意义。
    pub best_move: Option<usize>,
}

impl SearchResult {
    fn terminal(score: i32) -> Self {
        Self {
            score,
            best_move: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredMove {
    pub index: usize,
    pub score: i32,
}

fn ordered_moves(board: &Board) -> impl Iterator<Item = usize> + '_ {
    SEARCH_ORDER
        .iter()
        .copied()
        .filter(move |&index| board.is_vacant(index))
}

/// 带 alpha-beta 剪枝的极小化极大搜索。`computer` 为最大化一方的标记。
pub fn minimax(
    board: &Board,
    computer: Mark,
    depth: i32,
    maximizing: bool,
    mut alpha: i32,
    mut beta: i32,
    stats: &mut SearchStats,
) -> SearchResult {
    stats.nodes += 1;

    match evaluate(board) {
        Outcome::Won { winner } if winner == computer => {
            return SearchResult::terminal(WIN_SCORE - depth)
        }
        Outcome::Won { .. } => return SearchResult::terminal(depth - WIN_SCORE),
        Outcome::Draw => return SearchResult::terminal(0),
        Outcome::InProgress => {}
    }

    let mut best_move = None;

    if maximizing {
        let mut best_score = i32::MIN;
        for index in ordered_moves(board) {
            let child = board.with_move(index, computer);
            let result = minimax(&child, computer, depth + 1, false, alpha, beta, stats);
            if result.score > best_score {
                best_score = result.score;
                best_move = Some(index);
            }
            alpha = alpha.max(best_score);
            if beta <= alpha {
                break;
            }
        }
        SearchResult {
            score: best_score,
            best_move,
        }
    } else {
        let mut best_score = i32::MAX;
        for index in ordered_moves(board) {
            let child = board.with_move(index, computer.opponent());
            let result = minimax(&child, computer, depth + 1, true, alpha, beta, stats);
            if result.score < best_score {
                best_score = result.score;
                best_move = Some(index);
            }
            beta = beta.min(best_score);
            if beta <= alpha {
                break;
            }
        }
        SearchResult {
            score: best_score,
            best_move,
        }
    }
}

/// 为每个合法走法打分（电脑落子后由对手应对），按分数降序排列，同分保持搜索顺序。
pub fn rank_moves(board: &Board, computer: Mark, stats: &mut SearchStats) -> Vec<ScoredMove> {
    let mut moves: Vec<ScoredMove> = ordered_moves(board)
        .map(|index| {
            let child = board.with_move(index, computer);
            let result = minimax(&child, computer, 0, false, i32::MIN, i32::MAX, stats);
            ScoredMove {
                index,
                score: result.score,
            }
        })
        .collect();
    moves.sort_by(|a, b| b.score.cmp(&a.score));
    moves
}

fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    chance > 0.0 && rng.gen::<f64>() < chance
}

/// 按难度策略为电脑选择落子位置。随机源由调用方注入。
pub fn select_move<R: Rng + ?Sized>(
    board: &Board,
    computer: Mark,
    config: &OpponentConfig,
    rng: &mut R,
) -> Result<AiDecision, AiError> {
    let outcome = evaluate(board);
    if outcome.is_concluded() {
        return Err(AiError::GameConcluded { outcome });
    }

    let moves = legal_moves(board);
    if moves.is_empty() {
        return Err(AiError::NoLegalMove);
    }

    if roll(rng, config.random_move_chance) {
        let index = *moves.choose(rng).ok_or(AiError::NoLegalMove)?;
        return Ok(AiDecision {
            index,
            policy: DecisionPolicy::Random,
            score: None,
            nodes: 0,
        });
    }

    let mut stats = SearchStats::default();

    if roll(rng, config.suboptimal_chance) {
        let ranked = rank_moves(board, computer, &mut stats);
        let top = &ranked[..ranked.len().min(config.top_candidates.max(1))];
        let chosen = *top.choose(rng).ok_or(AiError::NoLegalMove)?;
        return Ok(AiDecision {
            index: chosen.index,
            policy: DecisionPolicy::TopCandidates,
            score: Some(chosen.score),
            nodes: stats.nodes,
        });
    }

    let result = minimax(board, computer, 0, true, i32::MIN, i32::MAX, &mut stats);
    let index = result.best_move.ok_or(AiError::NoLegalMove)?;
    Ok(AiDecision {
        index,
        policy: DecisionPolicy::BestPlay,
        score: Some(result.score),
        nodes: stats.nodes,
    })
}

pub struct OpponentAgent {
    config: OpponentConfig,
    rng: SmallRng,
}

impl OpponentAgent {
    pub fn new(config: OpponentConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: OpponentConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &OpponentConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: OpponentConfig) {
        self.config = config;
    }

    pub fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    pub fn decide(&mut self, board: &Board, computer: Mark) -> Result<AiDecision, AiError> {
        select_move(board, computer, &self.config, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn board(s: &str) -> Board {
        s.parse().expect("board literal should parse")
    }

    fn best_play() -> OpponentConfig {
        OpponentConfig::from_difficulty(Difficulty::Hard).with_suboptimal_chance(0.0)
    }

    /// 不剪枝的完整搜索，作为对照。
    fn oracle(
        board: &Board,
        computer: Mark,
        depth: i32,
        maximizing: bool,
        memo: &mut HashMap<(Board, i32, bool), i32>,
    ) -> i32 {
        if let Some(score) = memo.get(&(*board, depth, maximizing)) {
            return *score;
        }
        let score = match evaluate(board) {
            Outcome::Won { winner } if winner == computer => WIN_SCORE - depth,
            Outcome::Won { .. } => depth - WIN_SCORE,
            Outcome::Draw => 0,
            Outcome::InProgress => {
                let mover = if maximizing { computer } else { computer.opponent() };
                let scores = legal_moves(board).into_iter().map(|index| {
                    oracle(&board.with_move(index, mover), computer, depth + 1, !maximizing, memo)
                });
                if maximizing {
                    scores.max().expect("in-progress board has moves")
                } else {
                    scores.min().expect("in-progress board has moves")
                }
            }
        };
        memo.insert((*board, depth, maximizing), score);
        score
    }

    fn collect_reachable(board: Board, to_move: Mark, seen: &mut HashSet<Board>) {
        if !seen.insert(board) || evaluate(&board).is_concluded() {
            return;
        }
        for index in legal_moves(&board) {
            collect_reachable(board.with_move(index, to_move), to_move.opponent(), seen);
        }
    }

    #[test]
    fn hard_opens_in_the_center_when_not_rolling_suboptimal() {
        let mut rng = SmallRng::seed_from_u64(1);
        let decision = select_move(&Board::new(), Mark::O, &best_play(), &mut rng)
            .expect("empty board has moves");
        assert_eq!(decision.index, 4);
        assert_eq!(decision.policy, DecisionPolicy::BestPlay);
        assert_eq!(decision.score, Some(0));
    }

    #[test]
    fn hard_suboptimal_branch_picks_from_top_two() {
        let config = OpponentConfig::from_difficulty(Difficulty::Hard).with_suboptimal_chance(1.0);
        let mut stats = SearchStats::default();
        let ranked = rank_moves(&Board::new(), Mark::O, &mut stats);
        let top: Vec<usize> = ranked.iter().take(2).map(|m| m.index).collect();
        assert_eq!(top, vec![4, 0], "ties keep center then corner");

        let mut seen = HashSet::new();
        for seed in 0..64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let decision = select_move(&Board::new(), Mark::O, &config, &mut rng)
                .expect("empty board has moves");
            assert_eq!(decision.policy, DecisionPolicy::TopCandidates);
            assert!(top.contains(&decision.index), "picked {}", decision.index);
            seen.insert(decision.index);
        }
        assert_eq!(seen.len(), 2, "both candidates should be drawn");
    }

    #[test]
    fn takes_the_win_over_blocking() {
        // X 在 2 处有威胁，但 O 在 5 处可以直接获胜
        let b = board("XX./OO./...");
        let mut rng = SmallRng::seed_from_u64(2);
        let decision = select_move(&b, Mark::O, &best_play(), &mut rng).expect("moves exist");
        assert_eq!(decision.index, 5);
        assert_eq!(decision.score, Some(WIN_SCORE - 1));
    }

    #[test]
    fn blocks_the_only_threat() {
        let b = board("XX./O../...");
        let mut rng = SmallRng::seed_from_u64(3);
        let decision = select_move(&b, Mark::O, &best_play(), &mut rng).expect("moves exist");
        assert_eq!(decision.index, 2);

        // 对称情形：电脑执 X 时同样要堵住 O 的威胁
        let b = board("OO./X../..X");
        let decision = select_move(&b, Mark::X, &best_play(), &mut rng).expect("moves exist");
        assert_eq!(decision.index, 2);
    }

    #[test]
    fn unstoppable_fork_scores_a_delayed_loss() {
        let b = board("XX./.O./X.O");
        let mut stats = SearchStats::default();
        let result = minimax(&b, Mark::O, 0, true, i32::MIN, i32::MAX, &mut stats);
        assert_eq!(result.score, 2 - WIN_SCORE);
        assert!(result.best_move.is_some());
        assert!(stats.nodes > 1);
    }

    #[test]
    fn concluded_board_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(4);
        let draw = board("XOX/XOO/OXX");
        assert_eq!(
            select_move(&draw, Mark::O, &best_play(), &mut rng),
            Err(AiError::GameConcluded {
                outcome: Outcome::Draw
            })
        );
        assert!(legal_moves(&draw).is_empty());

        let won = board("XXX/OO./...");
        assert!(matches!(
            select_move(&won, Mark::O, &best_play(), &mut rng),
            Err(AiError::GameConcluded { .. })
        ));
    }

    #[test]
    fn minimax_matches_exhaustive_oracle_on_every_reachable_position() {
        let mut reachable = HashSet::new();
        collect_reachable(Board::new(), Mark::X, &mut reachable);
        collect_reachable(Board::new(), Mark::O, &mut reachable);

        let mut memo = HashMap::new();
        let mut checked = 0;
        for b in reachable {
            if evaluate(&b).is_concluded() || b.count(Mark::X) < b.count(Mark::O) {
                continue;
            }
            let mut stats = SearchStats::default();
            let result = minimax(&b, Mark::O, 0, true, i32::MIN, i32::MAX, &mut stats);
            let chosen = result.best_move.expect("in-progress board yields a move");
            assert!(b.is_vacant(chosen), "{b}: chose occupied cell {chosen}");

            let optimal = oracle(&b, Mark::O, 0, true, &mut memo);
            let achieved = oracle(&b.with_move(chosen, Mark::O), Mark::O, 1, false, &mut memo);
            assert_eq!(result.score, optimal, "{b}: root score");
            assert_eq!(achieved, optimal, "{b}: move {chosen} is not optimal");
            checked += 1;
        }
        assert!(checked > 4000, "only {checked} positions checked");
    }

    #[test]
    fn easy_is_uniform_over_legal_moves() {
        let config = OpponentConfig::from_difficulty(Difficulty::Easy);
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let samples = 9000;
        let mut counts = [0u32; 9];
        for _ in 0..samples {
            let decision =
                select_move(&Board::new(), Mark::O, &config, &mut rng).expect("moves exist");
            assert_eq!(decision.policy, DecisionPolicy::Random);
            counts[decision.index] += 1;
        }
        let expected = samples as f64 / 9.0;
        let chi_square: f64 = counts
            .iter()
            .map(|&c| {
                let diff = c as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 自由度 8，p = 0.001 的临界值
        assert!(chi_square < 26.12, "chi-square {chi_square} for {counts:?}");
    }

    #[test]
    fn easy_only_returns_legal_moves() {
        let b = board("X.O/.X./O..");
        let legal = legal_moves(&b);
        let mut agent =
            OpponentAgent::with_seed(OpponentConfig::from_difficulty(Difficulty::Easy), 9);
        for _ in 0..500 {
            let decision = agent.decide(&b, Mark::O).expect("moves exist");
            assert!(legal.contains(&decision.index));
        }
    }

    #[test]
    fn medium_is_random_about_half_the_time() {
        let mut agent =
            OpponentAgent::with_seed(OpponentConfig::from_difficulty(Difficulty::Medium), 11);
        let b = board("X../.../...");
        let random = (0..2000)
            .filter(|_| {
                let decision = agent.decide(&b, Mark::O).expect("moves exist");
                decision.policy == DecisionPolicy::Random
            })
            .count();
        assert!((850..=1150).contains(&random), "random picks: {random}");
    }

    #[test]
    fn medium_non_random_branch_is_best_play() {
        let config = OpponentConfig::from_difficulty(Difficulty::Medium).with_random_move_chance(0.0);
        let mut rng = SmallRng::seed_from_u64(5);
        let decision =
            select_move(&board("XX./O../..."), Mark::O, &config, &mut rng).expect("moves exist");
        assert_eq!(decision.policy, DecisionPolicy::BestPlay);
        assert_eq!(decision.index, 2);
    }

    #[test]
    fn hard_rolls_suboptimal_about_a_fifth_of_the_time() {
        let mut agent =
            OpponentAgent::with_seed(OpponentConfig::from_difficulty(Difficulty::Hard), 13);
        let b = board("X../.../...");
        let suboptimal = (0..2000)
            .filter(|_| {
                let decision = agent.decide(&b, Mark::O).expect("moves exist");
                decision.policy == DecisionPolicy::TopCandidates
            })
            .count();
        assert!((300..=500).contains(&suboptimal), "suboptimal picks: {suboptimal}");
    }

    #[test]
    fn difficulty_parses_english_and_spanish_labels() {
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!("Fácil".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!("medio".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!("normal".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!("difícil".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!("expert".parse::<Difficulty>(), Err(()));

        let parsed: Difficulty = serde_json::from_str(r#""difícil""#).expect("alias should parse");
        assert_eq!(parsed, Difficulty::Hard);
        assert_eq!(
            serde_json::to_string(&Difficulty::Medium).expect("serialize"),
            r#""medium""#
        );
    }
}
