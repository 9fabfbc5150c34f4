use crate::error::GameError;
use rand::Rng;
use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// --- 核心数据结构定义 ---

/// 花色 (Suit)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Heart,   // 红心 ♥️
    Diamond, // 方块 ♦️
    Club,    // 梅花 ♣️
    Spade,   // 黑桃 ♠️
}

/// 点数 (Rank)
/// 计分时 A 恒为 11，不存在 A-2-3-4-5 的小顺子
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

pub const SUITS: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

pub const RANKS: [Rank; 13] = [
    Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
    Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
];

impl Rank {
    /// 计分点数：2 到 10 取面值，J/Q/K 记 10，A 记 11
    pub fn value(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }
}

/// 单张扑克牌 (Card)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

/// 牌型类别，按强度从低到高排列，判别值即类别序号 (0-8)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum HandCategory {
    HighCard,      // 高牌
    OnePair,       // 一对
    TwoPair,       // 两对
    ThreeOfAKind,  // 三条
    Straight,      // 顺子
    Flush,         // 同花
    FullHouse,     // 葫芦
    FourOfAKind,   // 四条
    StraightFlush, // 同花顺
}

impl HandCategory {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// 牌力 (HandRank)
/// 字段顺序决定了派生的 `Ord`：先比类别，再比最大牌点数。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct HandRank {
    pub category: HandCategory,
    pub tiebreak: u8,
}

impl HandRank {
    /// 分数 = 100 × 类别 + 最大牌点数
    pub fn score(&self) -> u32 {
        100 * self.category.index() + u32::from(self.tiebreak)
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Heart => "♥️",
            Suit::Diamond => "♦️",
            Suit::Club => "♣️",
            Suit::Spade => "♠️",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
        })
    }
}

/// 文本牌面解析失败，例如 "1X"
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid card: '{0}'")]
pub struct ParseCardError(String);

/// 解析 "AS"、"10H"、"td" 这样的写法：点数在前，花色字母 (H/D/C/S) 在后
impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCardError(s.to_string());
        let s_upper = s.trim().to_ascii_uppercase();
        let split = match s_upper.char_indices().last() {
            Some((idx, _)) if idx > 0 => idx,
            _ => return Err(err()),
        };
        let (rank_str, suit_str) = s_upper.split_at(split);

        let suit = match suit_str {
            "H" => Suit::Heart,
            "D" => Suit::Diamond,
            "C" => Suit::Club,
            "S" => Suit::Spade,
            _ => return Err(err()),
        };
        let rank = match rank_str {
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" | "T" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            "A" => Rank::Ace,
            _ => return Err(err()),
        };
        Ok(Card { rank, suit })
    }
}

// --- 牌堆 ---

/// 创建一副完整的 52 张扑克牌（未洗牌）
fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for &rank in &RANKS {
        for &suit in &SUITS {
            deck.push(Card { rank, suit });
        }
    }
    deck
}

/// 一个牌局独占的牌堆。牌顶是 `cards` 的最后一个元素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// 用线程本地随机源洗好的一副新牌
    pub fn new() -> Deck {
        Self::shuffled(&mut rand::rng())
    }

    /// 用给定随机源均匀洗牌，方便注入带种子的随机源
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Deck {
        let mut cards = create_deck();
        cards.shuffle(rng);
        Deck { cards }
    }

    /// 按给定顺序码好的牌堆，最后一张最先被发出
    pub fn stacked(cards: Vec<Card>) -> Deck {
        Deck { cards }
    }

    pub fn empty() -> Deck {
        Deck { cards: Vec::new() }
    }

    /// 从牌顶摸一张牌
    pub fn draw(&mut self) -> Result<Card, GameError> {
        self.cards.pop().ok_or(GameError::EmptyDeck)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }
}

// --- 牌型评估逻辑 ---

/// 计算一组牌的牌力。
///
/// 这是一个简化的计分方案：直接在全部牌（通常是 2 张底牌 + 5 张公共牌）上判定牌型，
/// 而不是从 7 张里挑最优的 5 张。牌先按计分点数从大到小做稳定排序，
/// 之后的“相邻同点”判断比较的是 `Rank` 本身，所以 10/J/Q/K 虽然点数相同却不算对子，
/// 而且被它们隔开的同 `Rank` 牌也凑不成对子。
///
/// 判定顺序（命中即停）：同花顺、四条、葫芦、同花、顺子、三条、两对、一对、高牌。
/// - 葫芦 = 三条且有一对。由于三条本身就含相邻对子，任何三条都会被记为葫芦。
/// - 两对 = 相邻同点恰好出现 2 次；出现 3 次（三个对子）只算一对。
/// - 顺子要求全部牌点数两两相连，任何重复点数都会破坏顺子。
///
/// 空切片得到高牌、最大牌点数为 0；顺子与同花至少需要 5 张牌。
pub fn evaluate(cards: &[Card]) -> HandRank {
    let mut sorted = cards.to_vec();
    // 稳定排序：同点数的牌保持原有先后
    sorted.sort_by(|a, b| b.rank.value().cmp(&a.rank.value()));

    let tiebreak = sorted.first().map_or(0, |c| c.rank.value());
    let flush = is_flush(&sorted);
    let straight = is_straight(&sorted);

    let category = if straight && flush {
        HandCategory::StraightFlush
    } else if has_run(&sorted, 4) {
        HandCategory::FourOfAKind
    } else if has_run(&sorted, 3) && has_run(&sorted, 2) {
        HandCategory::FullHouse
    } else if flush {
        HandCategory::Flush
    } else if straight {
        HandCategory::Straight
    } else if has_run(&sorted, 3) {
        HandCategory::ThreeOfAKind
    } else if adjacent_pairs(&sorted) == 2 {
        HandCategory::TwoPair
    } else if has_run(&sorted, 2) {
        HandCategory::OnePair
    } else {
        HandCategory::HighCard
    };

    HandRank { category, tiebreak }
}

const MIN_STRAIGHT_OR_FLUSH: usize = 5;

fn is_flush(cards: &[Card]) -> bool {
    cards.len() >= MIN_STRAIGHT_OR_FLUSH && cards.windows(2).all(|w| w[0].suit == w[1].suit)
}

fn is_straight(cards: &[Card]) -> bool {
    if cards.len() < MIN_STRAIGHT_OR_FLUSH {
        return false;
    }
    let mut values: Vec<u8> = cards.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable();
    values.windows(2).all(|w| w[1] == w[0] + 1)
}

/// 是否存在连续 n 张相同点数 (Rank) 的牌
fn has_run(cards: &[Card], n: usize) -> bool {
    cards.windows(n).any(|w| w.iter().all(|c| c.rank == w[0].rank))
}

/// 相邻两张同点数的次数，不区分是否属于同一组
fn adjacent_pairs(cards: &[Card]) -> usize {
    cards.windows(2).filter(|w| w[0].rank == w[1].rank).count()
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn cards(s: &str) -> Vec<Card> {
        s.split_whitespace().map(|c| c.parse().unwrap()).collect()
    }

    // --- 牌堆测试 ---

    #[test]
    fn test_new_deck_has_52_distinct_cards() {
        for _ in 0..20 {
            let mut deck = Deck::new();
            assert_eq!(deck.len(), 52);
            let mut seen = HashSet::new();
            while let Ok(card) = deck.draw() {
                assert!(seen.insert(card), "重复的牌: {}", card);
            }
            assert_eq!(seen.len(), 52);
        }
    }

    #[test]
    fn test_draw_removes_top_card() {
        let mut deck = Deck::new();
        let card = deck.draw().unwrap();
        assert_eq!(deck.len(), 51);
        assert!(!deck.contains(&card));
    }

    #[test]
    fn test_draw_from_empty_deck_fails() {
        let mut deck = Deck::stacked(cards("AS"));
        assert_eq!(deck.draw(), Ok(Card::new(Rank::Ace, Suit::Spade)));
        assert_eq!(deck.draw(), Err(GameError::EmptyDeck));
        assert!(deck.is_empty());
        assert_eq!(Deck::empty().draw(), Err(GameError::EmptyDeck));
    }

    #[test]
    fn test_stacked_deck_deals_last_card_first() {
        let mut deck = Deck::stacked(cards("2H 3H 4H"));
        assert_eq!(deck.draw().unwrap().rank, Rank::Four);
        assert_eq!(deck.draw().unwrap().rank, Rank::Three);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let a = Deck::shuffled(&mut StdRng::seed_from_u64(7));
        let b = Deck::shuffled(&mut StdRng::seed_from_u64(7));
        let c = Deck::shuffled(&mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parse_card() {
        assert_eq!("10h".parse::<Card>(), Ok(Card::new(Rank::Ten, Suit::Heart)));
        assert_eq!("TD".parse::<Card>(), Ok(Card::new(Rank::Ten, Suit::Diamond)));
        assert_eq!("qc".parse::<Card>(), Ok(Card::new(Rank::Queen, Suit::Club)));
        assert!("1X".parse::<Card>().is_err());
        assert!("S".parse::<Card>().is_err());
        assert!("A♠".parse::<Card>().is_err());
        assert_eq!(Card::new(Rank::Ten, Suit::Heart).to_string(), "10♥️");
    }

    #[test]
    fn test_card_values() {
        assert_eq!(Rank::Two.value(), 2);
        assert_eq!(Rank::Ten.value(), 10);
        assert_eq!(Rank::Jack.value(), 10);
        assert_eq!(Rank::King.value(), 10);
        assert_eq!(Rank::Ace.value(), 11);
    }

    // --- 牌型评估测试 ---

    #[test]
    fn test_straight_flush() {
        let rank = evaluate(&cards("2H 3H 4H 5H 6H 7H 8H"));
        assert_eq!(rank.category, HandCategory::StraightFlush);
        assert_eq!(rank.tiebreak, 8);
        assert_eq!(rank.score(), 808);
    }

    #[test]
    fn test_four_of_a_kind() {
        let rank = evaluate(&cards("AS AH AD AC 2H 3H 4H"));
        assert_eq!(rank.category, HandCategory::FourOfAKind);
        assert_eq!(rank.score(), 711);
    }

    #[test]
    fn test_flush() {
        let rank = evaluate(&cards("2H 4H 6H 8H 10H QH AH"));
        assert_eq!(rank, HandRank { category: HandCategory::Flush, tiebreak: 11 });
    }

    #[test]
    fn test_straight_needs_every_card_connected() {
        assert_eq!(evaluate(&cards("3C 4D 5H 6S 7C 8D 9H")).score(), 409);
        // 5 到 A：10 点只有一张牌时才连得上
        assert_eq!(evaluate(&cards("5C 6D 7H 8S 9C 10D AH")).category, HandCategory::Straight);
        // 前五张连成顺子也不算，剩下的 K 对子起作用
        assert_eq!(evaluate(&cards("2C 3D 4H 5S 6C KD KH")).score(), 110);
    }

    #[test]
    fn test_trips_always_count_as_full_house() {
        // 三条天然包含相邻的对子，所以被记为葫芦
        let rank = evaluate(&cards("9S 9H 9D 2C 4H 6S KD"));
        assert_eq!(rank.category, HandCategory::FullHouse);
        assert_eq!(rank.score(), 610);
    }

    #[test]
    fn test_two_pair_and_three_pairs() {
        assert_eq!(evaluate(&cards("AS AH 5C 5D 2H 7S 9C")).score(), 211);
        // 三个对子不是“恰好两次”，只算一对
        assert_eq!(evaluate(&cards("AS AH 5C 5D 9H 9S 2C")).category, HandCategory::OnePair);
    }

    #[test]
    fn test_face_cards_share_a_value_but_not_a_rank() {
        // K、10、K 点数都是 10，稳定排序后两张 K 不相邻
        let rank = evaluate(&cards("KS 10H KD 2C 4D 6H 8S"));
        assert_eq!(rank, HandRank { category: HandCategory::HighCard, tiebreak: 10 });
    }

    #[test]
    fn test_high_card() {
        assert_eq!(evaluate(&cards("2C 4D 6H 8S 10C QD AH")).score(), 11);
    }

    #[test]
    fn test_short_inputs() {
        assert_eq!(evaluate(&[]), HandRank { category: HandCategory::HighCard, tiebreak: 0 });
        // 少于 5 张不判顺子/同花
        assert_eq!(evaluate(&cards("2H 3H")).category, HandCategory::HighCard);
        assert_eq!(evaluate(&cards("7H 7S 7D")).category, HandCategory::FullHouse);
    }

    #[test]
    fn test_rank_order_matches_score() {
        let hands = [
            "2C 4D 6H 8S 10C QD AH",
            "AS AH 5C 5D 9H 9S 2C",
            "AS AH 5C 5D 2H 7S 9C",
            "3C 4D 5H 6S 7C 8D 9H",
            "2H 4H 6H 8H 10H QH AH",
            "9S 9H 9D 2C 4H 6S KD",
            "AS AH AD AC 2H 3H 4H",
            "2H 3H 4H 5H 6H 7H 8H",
        ];
        let ranks: Vec<HandRank> = hands.iter().map(|h| evaluate(&cards(h))).collect();
        for pair in ranks.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].score() < pair[1].score());
        }
    }
}
