use crate::card::{Card, HandRank};
use crate::state::{GameState, PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- 牌局 -> 外部通信层 的通知 ---
// 牌局只决定“发给谁”和“说什么”，真正的发送由外部通信层完成。

/// 通知的接收方
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// 房间内所有人
    Room,
    /// 只发给某位玩家 (私聊)
    Player(PlayerId),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    GameStarted,
    PlayerJoined { player_id: PlayerId, nickname: String },
    /// 公共牌已发出，轮到第一位玩家
    CardsDealt { community: Vec<Card>, first_player: PlayerId, first_nickname: String },
    /// 私信：轮到你行动，附带你的底牌
    YourTurn { hand: Vec<Card> },
    /// 私信：check 后的牌力与得分
    HandScored { hand: Vec<Card>, rank: HandRank, score: u32 },
    PlayerFolded { player_id: PlayerId, nickname: String },
    Winner { player_id: PlayerId, nickname: String, score: u32 },
    GameOver,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub to: Recipient,
    pub event: GameEvent,
}

impl Notice {
    pub fn room(event: GameEvent) -> Self {
        Notice { to: Recipient::Room, event }
    }

    pub fn player(id: PlayerId, event: GameEvent) -> Self {
        Notice { to: Recipient::Player(id), event }
    }
}

/// 通知的投递端，由外部通信层实现。
/// 投递是同步的，从牌局的角度看总是成功。
pub trait NoticeSink {
    fn deliver(&self, notice: Notice);

    fn deliver_all(&self, notices: Vec<Notice>) {
        for notice in notices {
            self.deliver(notice);
        }
    }
}

/// 测试用：把通知收集起来
impl NoticeSink for std::cell::RefCell<Vec<Notice>> {
    fn deliver(&self, notice: Notice) {
        self.borrow_mut().push(notice);
    }
}

fn join_cards(cards: &[Card]) -> String {
    cards.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameEvent::GameStarted => write!(f, "New poker game started. Type /join to join the game."),
            GameEvent::PlayerJoined { nickname, .. } => write!(f, "{} joined the game.", nickname),
            GameEvent::CardsDealt { community, first_nickname, .. } => write!(
                f,
                "Cards dealt. Community cards: {} - It's {}'s turn. Type /check or /fold.",
                join_cards(community),
                first_nickname
            ),
            GameEvent::YourTurn { hand } => {
                write!(f, "{} - It's your turn. Type /check or /fold.", join_cards(hand))
            }
            GameEvent::HandScored { hand, rank, score } => write!(
                f,
                "Your hand: {} - {} - Your score: {}",
                join_cards(hand),
                rank.category,
                score
            ),
            GameEvent::PlayerFolded { nickname, .. } => write!(f, "{} folded.", nickname),
            GameEvent::Winner { nickname, score, .. } => {
                write!(f, "{} wins with a score of {}!", nickname, score)
            }
            GameEvent::GameOver => write!(f, "Game over. Type /start to play again."),
        }
    }
}

// --- 客户端 -> 服务器 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    // --- 房间管理消息 ---
    /// 客户端请求创建一个新房间 (聊天频道)
    CreateRoom { nickname: String },
    /// 客户端请求进入一个已存在的房间
    EnterRoom { room_id: RoomId, nickname: String },

    // --- 牌局指令 ---
    /// /start：开一局新牌局
    Start,
    /// /join：加入当前牌局
    Join,
    /// /deal：发牌
    Deal,
    /// /check：亮出并计算自己的牌力
    Check,
    /// /fold：弃牌
    Fold,
    /// /state：获取牌局快照
    GetState,
}

impl ClientMessage {
    /// 解析聊天里的斜杠指令，房间管理消息不走这里
    pub fn from_command(text: &str) -> Option<Self> {
        match text.trim().trim_start_matches('/').to_ascii_lowercase().as_str() {
            "start" => Some(ClientMessage::Start),
            "join" => Some(ClientMessage::Join),
            "deal" => Some(ClientMessage::Deal),
            "check" => Some(ClientMessage::Check),
            "fold" => Some(ClientMessage::Fold),
            "state" => Some(ClientMessage::GetState),
            _ => None,
        }
    }
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// 成功进入或创建房间后，服务器私密地发给该连接
    RoomEntered { room_id: RoomId, your_id: PlayerId },
    /// 牌局通知；`text` 是可以直接展示的文本
    Event { event: GameEvent, text: String },
    /// 净化后的牌局快照
    GameStateSnapshot(GameState),
    /// 指令被牌局拒绝，只发给发出指令的人
    Declined { message: String },
    /// 协议层错误 (未进入房间、房间不存在等)
    Error { message: String },
}

impl From<GameEvent> for ServerMessage {
    fn from(event: GameEvent) -> Self {
        let text = event.to_string();
        ServerMessage::Event { event, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{HandCategory, Rank, Suit};
    use std::cell::RefCell;
    use uuid::Uuid;

    #[test]
    fn test_slash_commands() {
        assert_eq!(ClientMessage::from_command("/start"), Some(ClientMessage::Start));
        assert_eq!(ClientMessage::from_command(" /CHECK "), Some(ClientMessage::Check));
        assert_eq!(ClientMessage::from_command("fold"), Some(ClientMessage::Fold));
        assert_eq!(ClientMessage::from_command("/raise 20"), None);
    }

    #[test]
    fn test_event_text() {
        let hand = vec![Card::new(Rank::Ace, Suit::Spade), Card::new(Rank::Ten, Suit::Heart)];
        let scored = GameEvent::HandScored {
            hand,
            rank: HandRank { category: HandCategory::OnePair, tiebreak: 11 },
            score: 111,
        };
        assert_eq!(scored.to_string(), "Your hand: A♠️ 10♥️ - One Pair - Your score: 111");

        let winner = GameEvent::Winner { player_id: Uuid::new_v4(), nickname: "bob".into(), score: 610 };
        assert_eq!(winner.to_string(), "bob wins with a score of 610!");
    }

    #[test]
    fn test_server_message_from_event_carries_text() {
        match ServerMessage::from(GameEvent::GameOver) {
            ServerMessage::Event { event, text } => {
                assert_eq!(event, GameEvent::GameOver);
                assert_eq!(text, "Game over. Type /start to play again.");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_client_message_json_round_trip() {
        let msg = ClientMessage::EnterRoom { room_id: Uuid::new_v4(), nickname: "carol".into() };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(serde_json::from_str::<ClientMessage>(&json).unwrap(), msg);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = RefCell::new(Vec::new());
        sink.deliver_all(vec![Notice::room(GameEvent::GameStarted), Notice::room(GameEvent::GameOver)]);
        assert_eq!(sink.borrow().len(), 2);
    }
}
