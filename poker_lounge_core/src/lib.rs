//! # 聊天室扑克牌局核心库
//!
//! 这个 `core` crate 包含牌局的全部状态和规则：牌堆、牌力计分、
//! 玩家表、按加入顺序轮流行动的牌局状态机，以及客户端-服务器通信消息。
//! 它不做任何 I/O，只把“发给谁、说什么”作为通知返回，
//! 由上层的通信层 (服务器、聊天机器人) 负责真正投递。

mod card;
mod error;
mod logic;
mod message;
mod state;

pub use card::*;

pub use error::*;

pub use logic::*;

pub use message::*;

pub use state::*;
