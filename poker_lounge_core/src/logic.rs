use crate::card::*;
use crate::error::GameError;
use crate::message::{GameEvent, Notice};
use crate::state::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

/// 每位玩家的底牌数
pub const HOLE_CARDS: usize = 2;
/// 公共牌数
pub const COMMUNITY_CARDS: usize = 5;
/// 发牌所需的最少玩家数
pub const MIN_PLAYERS: usize = 2;

/// 牌局指令的结果：成功时返回要发出的通知，失败时牌局保持原样
pub type Outcome = Result<Vec<Notice>, GameError>;

/// 一个房间里的一局牌。
///
/// 牌堆、玩家表、公共牌和行动指针都归它独占。
/// 所有方法都要求 `&mut self`，同一牌局的指令天然串行；
/// 多房间并发时由外层为每个牌局单独加锁。
#[derive(Debug)]
pub struct GameSession {
    room_id: RoomId,
    phase: GamePhase,
    deck: Deck,
    players: PlayerRegistry,
    community_cards: Vec<Card>,
    current_turn: Option<PlayerId>,  // 当前应该行动的玩家
    rng: StdRng,  // 洗牌用的随机源，每次 start 都从这里洗出新牌
}

impl GameSession {
    /// 新建的牌局处于 Idle，牌堆为空，需要先 start
    pub fn new(room_id: RoomId) -> Self {
        Self::with_rng(room_id, StdRng::from_rng(&mut rand::rng()))
    }

    /// 用固定种子洗牌，便于复现
    pub fn with_seed(room_id: RoomId, seed: u64) -> Self {
        Self::with_rng(room_id, StdRng::seed_from_u64(seed))
    }

    fn with_rng(room_id: RoomId, rng: StdRng) -> Self {
        GameSession {
            room_id,
            phase: GamePhase::Idle,
            deck: Deck::empty(),
            players: PlayerRegistry::new(),
            community_cards: Vec::new(),
            current_turn: None,
            rng,
        }
    }

    // --- 只读访问 ---

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn community_cards(&self) -> &[Card] {
        &self.community_cards
    }

    pub fn current_turn(&self) -> Option<PlayerId> {
        self.current_turn
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.len()
    }

    /// 完整快照 (包含所有人的底牌)，发给客户端前要调用 `for_client`
    pub fn snapshot(&self) -> GameState {
        GameState {
            room_id: self.room_id,
            phase: self.phase.clone(),
            players: self.players.iter().cloned().collect(),
            community_cards: self.community_cards.clone(),
            current_turn: self.current_turn,
            deck_remaining: self.deck.len(),
        }
    }

    // --- 核心游戏流程 ---

    /// 开一局新牌局：清空玩家，洗一副新牌
    pub fn start(&mut self) -> Vec<Notice> {
        let deck = Deck::shuffled(&mut self.rng);
        self.start_with_deck(deck)
    }

    /// 用指定牌堆开局
    pub fn start_with_deck(&mut self, deck: Deck) -> Vec<Notice> {
        self.players.clear();
        self.deck = deck;
        self.community_cards.clear();
        self.current_turn = None;
        self.phase = GamePhase::Joining;
        debug!(room_id = %self.room_id, deck = self.deck.len(), "牌局开始");

        vec![Notice::room(GameEvent::GameStarted)]
    }

    /// 加入牌局。任何阶段都接受，新玩家排在行动顺序末尾。
    pub fn join(&mut self, player_id: PlayerId, nickname: &str) -> Outcome {
        let player = self.players.join(player_id, nickname)?;
        debug!(room_id = %self.room_id, %player_id, nickname, "玩家加入");

        Ok(vec![Notice::room(GameEvent::PlayerJoined {
            player_id,
            nickname: player.nickname.clone(),
        })])
    }

    /// 发牌
    ///
    /// - 至少需要 2 名玩家。
    /// - 按加入顺序轮流发底牌，每轮每人一张，共两轮；然后发 5 张公共牌。
    /// - 不换新牌：牌堆沿用 start 时洗好的那副，剩余张数不够时拒绝发牌。
    /// - 第一位加入的玩家先行动。
    pub fn deal(&mut self) -> Outcome {
        let player_count = self.players.len();
        if player_count < MIN_PLAYERS {
            return Err(GameError::InsufficientPlayers { found: player_count });
        }
        // 先确认牌够，保证失败时不动任何状态
        if self.deck.len() < player_count * HOLE_CARDS + COMMUNITY_CARDS {
            return Err(GameError::EmptyDeck);
        }

        self.players.reset_for_deal();
        self.community_cards.clear();

        let order = self.players.order().to_vec();
        for _ in 0..HOLE_CARDS {
            for player_id in &order {
                let card = self.deck.draw()?;
                if let Some(player) = self.players.get_mut(player_id) {
                    player.hand.push(card);
                }
            }
        }
        for _ in 0..COMMUNITY_CARDS {
            self.community_cards.push(self.deck.draw()?);
        }

        let first = order[0];
        self.current_turn = Some(first);
        self.phase = GamePhase::Dealt;
        debug!(room_id = %self.room_id, players = player_count, deck = self.deck.len(), "发牌完成");

        let first_player = self.players.get(&first).ok_or(GameError::UnknownPlayer)?;
        Ok(vec![
            Notice::room(GameEvent::CardsDealt {
                community: self.community_cards.clone(),
                first_player: first,
                first_nickname: first_player.nickname.clone(),
            }),
            Notice::player(first, GameEvent::YourTurn { hand: first_player.hand.clone() }),
        ])
    }

    /// 亮牌计分：用底牌加公共牌计算牌力，记下得分，然后轮到下一位
    pub fn check(&mut self, player_id: PlayerId) -> Outcome {
        self.ensure_turn(&player_id)?;

        let player = self.players.get_mut(&player_id).ok_or(GameError::UnknownPlayer)?;
        let mut pool = player.hand.clone();
        pool.extend_from_slice(&self.community_cards);
        let rank = evaluate(&pool);
        player.score = rank.score();
        debug!(room_id = %self.room_id, %player_id, score = player.score, "玩家亮牌");

        let mut notices = vec![Notice::player(player_id, GameEvent::HandScored {
            hand: player.hand.clone(),
            rank,
            score: player.score,
        })];
        notices.extend(self.advance_turn(player_id));
        Ok(notices)
    }

    /// 弃牌。弃牌玩家仍保留之前的得分，比牌时照样参与。
    pub fn fold(&mut self, player_id: PlayerId) -> Outcome {
        self.ensure_turn(&player_id)?;

        let player = self.players.get_mut(&player_id).ok_or(GameError::UnknownPlayer)?;
        player.folded = true;
        debug!(room_id = %self.room_id, %player_id, "玩家弃牌");

        let mut notices = vec![Notice::room(GameEvent::PlayerFolded {
            player_id,
            nickname: player.nickname.clone(),
        })];
        notices.extend(self.advance_turn(player_id));
        Ok(notices)
    }

    // --- 辅助逻辑函数 ---

    fn ensure_turn(&self, player_id: &PlayerId) -> Result<(), GameError> {
        if !self.players.contains(player_id) {
            return Err(GameError::UnknownPlayer);
        }
        if self.phase != GamePhase::Dealt || self.current_turn != Some(*player_id) {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    /// 行动权交给顺序中的下一位；最后一位行动后进入比牌
    fn advance_turn(&mut self, acted: PlayerId) -> Vec<Notice> {
        let next = self
            .players
            .position(&acted)
            .and_then(|idx| self.players.order().get(idx + 1))
            .copied();

        match next {
            Some(next_id) => {
                self.current_turn = Some(next_id);
                trace!(room_id = %self.room_id, player_id = %next_id, "轮到下一位玩家");
                let hand = self.players.hand(&next_id).map(<[Card]>::to_vec).unwrap_or_default();
                vec![Notice::player(next_id, GameEvent::YourTurn { hand })]
            }
            None => {
                self.phase = GamePhase::Showdown;
                self.showdown()
            }
        }
    }

    /// 比牌：得分最高者获胜，同分时按行动顺序取靠前的一位。
    /// 不排除弃牌玩家。结束后回到 Idle。
    fn showdown(&mut self) -> Vec<Notice> {
        let mut winner: Option<&Player> = None;
        for player in self.players.iter() {
            if winner.is_none_or(|w| player.score > w.score) {
                winner = Some(player);
            }
        }

        let mut notices = Vec::with_capacity(2);
        if let Some(w) = winner {
            debug!(room_id = %self.room_id, player_id = %w.id, score = w.score, "比牌结束");
            notices.push(Notice::room(GameEvent::Winner {
                player_id: w.id,
                nickname: w.nickname.clone(),
                score: w.score,
            }));
        }
        notices.push(Notice::room(GameEvent::GameOver));

        self.current_turn = None;
        self.phase = GamePhase::Idle;
        notices
    }
}

// --- 单元测试 ---
