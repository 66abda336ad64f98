pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{
    minimax, rank_moves, select_move, AiDecision, AiError, DecisionPolicy, Difficulty,
    OpponentAgent, OpponentConfig, ScoredMove, SearchResult, SearchStats,
};
pub use game::{
    evaluate, legal_moves, Board, GameEvent, GameRecord, GameSession, GameSettings, GameStats,
    Mark, MoveResolution, Outcome, PlayerStats, SessionPhase, SettingsError, COMPUTER_MARK,
    SETTINGS_STORAGE_KEY,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// 电脑落子前的默认延迟（毫秒），让界面先渲染玩家的落子。
const DEFAULT_OPPONENT_DELAY_MS: u32 = 500;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error<E: Serialize>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_difficulty(value: Option<&str>) -> Difficulty {
    value
        .and_then(|value| Difficulty::from_str(value).ok())
        .unwrap_or_default()
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

fn store_settings(settings: &GameSettings) -> Result<(), JsValue> {
    let json = settings.to_json().map_err(to_js_error)?;
    match local_storage() {
        Some(storage) => storage.set_item(SETTINGS_STORAGE_KEY, &json),
        None => {
            crate::console_warn!("localStorage unavailable, settings not saved");
            Ok(())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView<'a> {
    board: &'a Board,
    next: Mark,
    phase: SessionPhase,
    outcome: Outcome,
    vs_computer: bool,
    difficulty: Difficulty,
    settings: &'a GameSettings,
}

#[derive(Serialize)]
struct OpponentMoveResponse {
    decision: AiDecision,
    applied: MoveResolution,
}

#[wasm_bindgen]
pub struct TicTacToe {
    session: GameSession,
    settings: GameSettings,
    agent: OpponentAgent,
}

#[wasm_bindgen]
impl TicTacToe {
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<TicTacToe, JsValue> {
        let settings = match settings_json {
            Some(json) => GameSettings::from_json(&json).map_err(to_js_error)?,
            None => GameSettings::default(),
        };
        let session = GameSession::from_settings(&settings);
        let agent = OpponentAgent::new(session.opponent_config());
        Ok(TicTacToe {
            session,
            settings,
            agent,
        })
    }

    /// 校验并应用新的对局设置，然后开新局。
    pub fn configure(&mut self, settings_json: &str) -> Result<String, JsValue> {
        let mut settings = GameSettings::from_json(settings_json).map_err(to_js_error)?;
        settings.validate().map_err(to_js_error)?;
        if settings.vs_computer {
            settings.player_o = PlayerStats::new(game::COMPUTER_NAME);
        }
        store_settings(&settings)?;
        self.session = GameSession::from_settings(&settings);
        self.agent.set_config(self.session.opponent_config());
        self.settings = settings;
        self.session.start(self.agent.rng_mut());
        self.state_json()
    }

    /// 重新开局；对电脑时重新抛硬币决定先手。
    pub fn restart(&mut self) -> Result<String, JsValue> {
        self.session.start(self.agent.rng_mut());
        self.state_json()
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        self.session.reset();
        self.state_json()
    }

    /// 玩家落子。非法落子返回 `"null"`，不会报错。
    pub fn play(&mut self, index: usize) -> Result<String, JsValue> {
        let resolution = self.session.play(index);
        if let Some(resolution) = &resolution {
            self.after_move(resolution)?;
        }
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    /// 立即计算并应用电脑的落子。
    pub fn opponent_move(&mut self) -> Result<String, JsValue> {
        let (decision, applied) = self
            .session
            .play_opponent(self.agent.rng_mut())
            .ok_or_else(|| JsValue::from_str("not the computer's turn"))?;
        crate::console_log!(
            "computer played {} ({:?}, {} nodes)",
            decision.index,
            decision.policy,
            decision.nodes
        );
        self.after_move(&applied)?;
        let response = OpponentMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 延迟后在当前棋盘的副本上计算电脑落子，返回决策 JSON；由调用方通过
    /// `apply_opponent_move` 应用。
    pub fn think_opponent(&self, delay_ms: Option<u32>) -> Promise {
        if self.session.phase() != SessionPhase::AwaitingOpponentMove {
            return Promise::reject(&JsValue::from_str("not the computer's turn"));
        }
        let board = *self.session.board();
        let config = self.session.opponent_config();
        let delay = delay_ms.unwrap_or(DEFAULT_OPPONENT_DELAY_MS);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = OpponentAgent::new(config);
            let decision = agent.decide(&board, COMPUTER_MARK).map_err(to_js_error)?;
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn apply_opponent_move(&mut self, index: usize) -> Result<String, JsValue> {
        let resolution = self.session.apply_opponent_move(index);
        if let Some(resolution) = &resolution {
            self.after_move(resolution)?;
        }
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    pub fn set_difficulty(&mut self, difficulty: &str) -> Result<String, JsValue> {
        let difficulty = Difficulty::from_str(difficulty)
            .map_err(|_| JsValue::from_str(&format!("unknown difficulty: {difficulty}")))?;
        self.session.change_difficulty(difficulty, self.agent.rng_mut());
        self.agent.set_config(self.session.opponent_config());
        self.settings.difficulty = difficulty;
        store_settings(&self.settings)?;
        self.state_json()
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        let view = SessionView {
            board: self.session.board(),
            next: self.session.next(),
            phase: self.session.phase(),
            outcome: self.session.outcome(),
            vs_computer: self.session.vs_computer(),
            difficulty: self.session.difficulty(),
            settings: &self.settings,
        };
        serde_json::to_string(&view).map_err(serde_to_js_error)
    }

    pub fn settings_json(&self) -> Result<String, JsValue> {
        self.settings.to_json().map_err(to_js_error)
    }

    /// 已结束对局的记录（供上报）；进行中返回 `"null"`。
    pub fn record_json(&self, date: Option<String>) -> Result<String, JsValue> {
        let date = date.unwrap_or_else(utils::now_iso);
        let record = GameRecord::finished(&self.settings, self.session.outcome(), date);
        serde_json::to_string(&record).map_err(serde_to_js_error)
    }
}

impl TicTacToe {
    /// 对局结束时更新胜场并保存设置。
    fn after_move(&mut self, resolution: &MoveResolution) -> Result<(), JsValue> {
        if let Some(stats) = self.settings.record_outcome(resolution.outcome) {
            crate::console_log!("{} wins ({} total)", stats.name, stats.wins);
            store_settings(&self.settings)?;
        }
        Ok(())
    }
}

#[wasm_bindgen(js_name = "evaluateBoard")]
pub fn evaluate_board(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_value(&evaluate(&board)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "legalMoves")]
pub fn legal_moves_js(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_value(&legal_moves(&board)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "selectMove")]
pub fn select_move_js(
    board: JsValue,
    computer: &str,
    difficulty: Option<String>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let computer = Mark::from_str(computer)
        .map_err(|_| JsValue::from_str(&format!("unknown mark: {computer}")))?;
    let config = OpponentConfig::from_difficulty(parse_difficulty(difficulty.as_deref()));
    let mut agent = OpponentAgent::new(config);
    let decision = agent.decide(&board, computer).map_err(to_js_error)?;
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "loadSettings")]
pub fn load_settings() -> Result<JsValue, JsValue> {
    let stored = match local_storage() {
        Some(storage) => storage.get_item(SETTINGS_STORAGE_KEY)?,
        None => None,
    };
    let settings = match stored {
        Some(json) => match GameSettings::from_json(&json) {
            Ok(settings) => Some(settings),
            Err(error) => {
                crate::console_warn!("ignoring stored settings: {error}");
                None
            }
        },
        None => None,
    };
    to_value(&settings).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "saveSettings")]
pub fn save_settings(settings_json: &str) -> Result<(), JsValue> {
    let settings = GameSettings::from_json(settings_json).map_err(to_js_error)?;
    settings.validate().map_err(to_js_error)?;
    store_settings(&settings)
}

#[wasm_bindgen(js_name = "clearSettings")]
pub fn clear_settings() -> Result<(), JsValue> {
    match local_storage() {
        Some(storage) => storage.remove_item(SETTINGS_STORAGE_KEY),
        None => Ok(()),
    }
}

#[wasm_bindgen(js_name = "summarizeRecords")]
pub fn summarize_records(records_json: &str) -> Result<String, JsValue> {
    let records: Vec<GameRecord> =
        serde_json::from_str(records_json).map_err(serde_to_js_error)?;
    serde_json::to_string(&GameStats::from_records(records)).map_err(serde_to_js_error)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
