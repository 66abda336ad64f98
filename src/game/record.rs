//! 对局记录与胜场统计，对应记录服务的请求体与汇总结果。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::board::{Mark, Outcome};
use super::settings::{GameSettings, PlayerStats};
use crate::ai::Difficulty;

/// 一局结束后上报的记录。`winner` 为 `null` 表示平局。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub player_x: PlayerStats,
    pub player_o: PlayerStats,
    pub winner: Option<Mark>,
    pub date: String,
    pub vs_computer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

impl GameRecord {
    /// 对局尚未结束时返回 `None`。
    pub fn finished(
        settings: &GameSettings,
        outcome: Outcome,
        date: impl Into<String>,
    ) -> Option<Self> {
        if !outcome.is_concluded() {
            return None;
        }
        Some(Self {
            player_x: settings.player_x.clone(),
            player_o: settings.player_o.clone(),
            winner: outcome.winner(),
            date: date.into(),
            vs_computer: settings.vs_computer,
            difficulty: settings.vs_computer.then_some(settings.difficulty),
        })
    }

    pub fn name_of(&self, mark: Mark) -> &str {
        match mark {
            Mark::X => &self.player_x.name,
            Mark::O => &self.player_o.name,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub games: Vec<GameRecord>,
    pub total_games: usize,
    pub player_stats: BTreeMap<String, PlayerStats>,
}

impl GameStats {
    /// 按名字汇总胜场：出现过的每个名字都有条目，胜者条目加一。
    pub fn from_records(games: Vec<GameRecord>) -> Self {
        let mut player_stats: BTreeMap<String, PlayerStats> = BTreeMap::new();
        for game in &games {
            for mark in [Mark::X, Mark::O] {
                let name = game.name_of(mark);
                let entry = player_stats
                    .entry(name.to_string())
                    .or_insert_with(|| PlayerStats::new(name));
                if game.winner == Some(mark) {
                    entry.wins += 1;
                }
            }
        }
        Self {
            total_games: games.len(),
            games,
            player_stats,
        }
    }
}
