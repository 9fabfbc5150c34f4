use thiserror::Error;

/// 牌局操作被拒绝的原因。
///
/// 所有错误都可以由调用方恢复：返回错误时牌局状态保持不变。
/// `Display` 的文本直接回复给发出指令的玩家。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("The deck is empty. Type /start to shuffle a new one.")]
    EmptyDeck,
    #[error("You are already in the game.")]
    AlreadyJoined,
    #[error("Need at least 2 players to start the game ({found} joined).")]
    InsufficientPlayers { found: usize },
    #[error("It's not your turn.")]
    NotYourTurn,
    #[error("You are not in the game. Type /join to join.")]
    UnknownPlayer,
}
