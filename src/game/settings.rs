use serde::{Deserialize, Serialize};
use std::fmt;

use super::board::{Mark, Outcome};
use crate::ai::Difficulty;

/// 浏览器 localStorage 中保存设置所用的键。
pub const SETTINGS_STORAGE_KEY: &str = "tictactoeSettings";

/// 对电脑时 O 方使用的名字。
pub const COMPUTER_NAME: &str = "Computer";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStats {
    pub name: String,
    #[serde(default)]
    pub wins: u32,
}

impl PlayerStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wins: 0,
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SettingsError {
    MissingPlayerName { mark: Mark },
    Malformed { message: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::MissingPlayerName { mark } => {
                write!(f, "player {mark} needs a name")
            }
            SettingsError::Malformed { message } => write!(f, "malformed settings: {message}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<serde_json::Error> for SettingsError {
    fn from(error: serde_json::Error) -> Self {
        SettingsError::Malformed {
            message: error.to_string(),
        }
    }
}

/// 玩家名字、累计胜场与难度偏好，跨对局保存在本地。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub player_x: PlayerStats,
    pub player_o: PlayerStats,
    #[serde(default)]
    pub vs_computer: bool,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl GameSettings {
    pub fn two_player(player_x: impl Into<String>, player_o: impl Into<String>) -> Self {
        Self {
            player_x: PlayerStats::new(player_x),
            player_o: PlayerStats::new(player_o),
            vs_computer: false,
            difficulty: Difficulty::default(),
        }
    }

    pub fn against_computer(player_x: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            player_x: PlayerStats::new(player_x),
            player_o: PlayerStats::new(COMPUTER_NAME),
            vs_computer: true,
            difficulty,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// O 方名字只在双人对战时必填。
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.player_x.has_name() {
            return Err(SettingsError::MissingPlayerName { mark: Mark::X });
        }
        if !self.vs_computer && !self.player_o.has_name() {
            return Err(SettingsError::MissingPlayerName { mark: Mark::O });
        }
        Ok(())
    }

    pub fn player(&self, mark: Mark) -> &PlayerStats {
        match mark {
            Mark::X => &self.player_x,
            Mark::O => &self.player_o,
        }
    }

    pub fn player_mut(&mut self, mark: Mark) -> &mut PlayerStats {
        match mark {
            Mark::X => &mut self.player_x,
            Mark::O => &mut self.player_o,
        }
    }

    /// 胜者胜场加一；平局或未结束时不变。返回胜者的最新统计。
    pub fn record_outcome(&mut self, outcome: Outcome) -> Option<&PlayerStats> {
        let winner = outcome.winner()?;
        let stats = self.player_mut(winner);
        stats.wins = stats.wins.saturating_add(1);
        Some(stats)
    }
}
