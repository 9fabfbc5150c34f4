use crate::card::Card;
use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub hand: Vec<Card>,  // 底牌，发牌前为空，发牌后 2 张
    pub score: u32,  // 最近一次 check 的得分，发新牌时不清零
    pub folded: bool,
}

impl Player {
    pub fn new(id: PlayerId, nickname: impl Into<String>) -> Self {
        Player {
            id,
            nickname: nickname.into(),
            hand: Vec::new(),
            score: 0,
            folded: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GamePhase {
    /// 没有进行中的牌局 (尚未 /start，或上一局已结束)
    #[default]
    Idle,
    /// 已开局，等待玩家加入
    Joining,
    /// 已发牌，按顺序轮流行动
    Dealt,
    /// 最后一位玩家行动后比牌
    Showdown,
}

/// 一个牌局内的玩家表。
/// 加入的先后顺序就是行动顺序，牌局内不会改变。
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,  // 可以根据player id查找player
    order: Vec<PlayerId>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一名新玩家，排在行动顺序末尾
    pub fn join(&mut self, id: PlayerId, nickname: &str) -> Result<&Player, GameError> {
        if self.players.contains_key(&id) {
            return Err(GameError::AlreadyJoined);
        }
        self.order.push(id);
        Ok(self.players.entry(id).or_insert_with(|| Player::new(id, nickname)))
    }

    /// 为新一手牌清空所有人的底牌和弃牌标记，玩家本身保留
    pub fn reset_for_deal(&mut self) {
        for player in self.players.values_mut() {
            player.hand.clear();
            player.folded = false;
        }
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.order.clear();
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn hand(&self, id: &PlayerId) -> Option<&[Card]> {
        self.get(id).map(|p| p.hand.as_slice())
    }

    pub fn score(&self, id: &PlayerId) -> Option<u32> {
        self.get(id).map(|p| p.score)
    }

    pub fn is_folded(&self, id: &PlayerId) -> Option<bool> {
        self.get(id).map(|p| p.folded)
    }

    /// 行动顺序
    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn position(&self, id: &PlayerId) -> Option<usize> {
        self.order.iter().position(|p| p == id)
    }

    /// 按行动顺序遍历玩家
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }
}

/// 牌局快照，供诊断和客户端同步使用
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub room_id: RoomId,
    pub phase: GamePhase,
    // 按行动顺序排列
    pub players: Vec<Player>,
    pub community_cards: Vec<Card>,
    pub current_turn: Option<PlayerId>,
    pub deck_remaining: usize,
}

impl GameState {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    /// 给某位玩家看的快照：隐藏其他玩家的底牌
    pub fn for_client(&self, client_id: &PlayerId) -> Self {
        let mut client_state = self.clone();
        for player in client_state.players.iter_mut() {
            if player.id != *client_id {
                player.hand.clear();
            }
        }
        client_state
    }
}

// --- 单元测试 ---
