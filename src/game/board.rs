use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 棋盘格子数量（3×3）。
pub const BOARD_CELLS: usize = 9;

/// 所有获胜连线：三行、三列、两条对角线，按此固定顺序检查。
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 棋子标记。X 为先手玩家，O 为第二位玩家或电脑。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

impl FromStr for Mark {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "X" | "x" => Ok(Mark::X),
            "O" | "o" => Ok(Mark::O),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 由棋盘推导出的对局结果，从不单独存储。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Outcome {
    InProgress,
    Won { winner: Mark },
    Draw,
}

impl Outcome {
    pub fn is_concluded(&self) -> bool {
        !matches!(self, Outcome::InProgress)
    }

    pub fn winner(&self) -> Option<Mark> {
        match self {
            Outcome::Won { winner } => Some(*winner),
            _ => None,
        }
    }
}

/// 9 个格子的棋盘，序列化为 `null | "X" | "O"` 组成的数组。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Board {
    cells: [Option<Mark>; BOARD_CELLS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Option<Mark>; BOARD_CELLS]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Option<Mark>; BOARD_CELLS] {
        &self.cells
    }

    /// 越界索引视为空格之外的无效位置，返回 `None`。
    pub fn get(&self, index: usize) -> Option<Mark> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_vacant(&self, index: usize) -> bool {
        matches!(self.cells.get(index), Some(None))
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.cells.iter().filter(|cell| **cell == Some(mark)).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn winner(&self) -> Option<Mark> {
        WINNING_LINES.iter().find_map(|&[a, b, c]| {
            let mark = self.cells[a]?;
            if self.cells[b] == Some(mark) && self.cells[c] == Some(mark) {
                Some(mark)
            } else {
                None
            }
        })
    }

    pub fn evaluate(&self) -> Outcome {
        evaluate(self)
    }

    pub fn legal_moves(&self) -> Vec<usize> {
        legal_moves(self)
    }

    /// 落子。格子越界、已被占用或对局已结束时不做任何修改并返回 `false`。
    pub fn place(&mut self, index: usize, mark: Mark) -> bool {
        if !self.is_vacant(index) || self.winner().is_some() {
            return false;
        }
        self.cells[index] = Some(mark);
        true
    }

    /// 搜索用：返回落子后的新棋盘，调用方保证 `index` 为空格。
    pub(crate) fn with_move(&self, index: usize, mark: Mark) -> Board {
        let mut next = *self;
        next.cells[index] = Some(mark);
        next
    }

    pub fn clear(&mut self) {
        self.cells = [None; BOARD_CELLS];
    }
}

impl FromStr for Board {
    type Err = ();

    /// 解析 9 个字符（`X`、`O`、`.` 或 `-`），忽略空白与 `/` 分隔符。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = [None; BOARD_CELLS];
        let mut filled = 0;
        for ch in s.chars().filter(|c| !c.is_whitespace() && *c != '/') {
            if filled == BOARD_CELLS {
                return Err(());
            }
            cells[filled] = match ch {
                'X' | 'x' => Some(Mark::X),
                'O' | 'o' => Some(Mark::O),
                '.' | '-' | '_' => None,
                _ => return Err(()),
            };
            filled += 1;
        }
        if filled != BOARD_CELLS {
            return Err(());
        }
        Ok(Board { cells })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                write!(f, "/")?;
            }
            for cell in chunk {
                write!(f, "{}", cell.map(Mark::as_char).unwrap_or('.'))?;
            }
        }
        Ok(())
    }
}

/// 判定胜负：任一连线三子相同则该标记获胜，否则满盘为平局，其余为进行中。
pub fn evaluate(board: &Board) -> Outcome {
    if let Some(winner) = board.winner() {
        Outcome::Won { winner }
    } else if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::InProgress
    }
}

/// 按索引升序列出所有空格。
pub fn legal_moves(board: &Board) -> Vec<usize> {
    board
        .cells
        .iter()
        .enumerate()
        .filter_map(|(index, cell)| cell.is_none().then_some(index))
        .collect()
}
