use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use dashmap::DashMap;
use futures_util::{stream::StreamExt, SinkExt};
use parking_lot::{Mutex as P_Mutex, RwLock as P_RwLock};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use poker_lounge_core::{
    ClientMessage, GameError, GameSession, GameState, Notice, NoticeSink, PlayerId, Recipient, RoomId,
    ServerMessage,
};

const DEFAULT_LOG_FILTER: &str = "info,poker_lounge_server=debug,poker_lounge_core=debug";

/// 服务器配置，命令行参数优先，其次环境变量
#[derive(Parser, Debug, Clone)]
#[command(name = "poker_lounge_server", about = "多房间聊天扑克牌局服务器")]
struct ServerConfig {
    /// 监听地址
    #[arg(long, env = "POKER_LOUNGE_ADDR", default_value = "0.0.0.0:25917")]
    addr: SocketAddr,
    /// 洗牌种子；设置后每个房间按 seed + 房间创建序号洗牌，便于复现
    #[arg(long, env = "POKER_LOUNGE_SEED")]
    seed: Option<u64>,
    /// 每个连接的待发送消息队列长度
    #[arg(long, env = "POKER_LOUNGE_CHANNEL_CAPACITY", default_value_t = 32)]
    channel_capacity: usize,
}

// 服务器全局状态
struct AppState {
    config: ServerConfig,
    rooms: DashMap<RoomId, Arc<Room>>,
    rooms_created: AtomicU64,
}

impl AppState {
    fn new(config: ServerConfig) -> Self {
        AppState {
            config,
            rooms: DashMap::new(),
            rooms_created: AtomicU64::new(0),
        }
    }

    fn new_session(&self, room_id: RoomId) -> GameSession {
        let index = self.rooms_created.fetch_add(1, Ordering::Relaxed);
        match self.config.seed {
            Some(seed) => GameSession::with_seed(room_id, seed.wrapping_add(index)),
            None => GameSession::new(room_id),
        }
    }
}

// 单个房间 (聊天频道)，独占一个牌局
// 重要‼️：两把锁从不同时持有：先读 members 取昵称，释放后再锁 session，
// 牌局产生的通知在释放 session 之后才投递。
struct Room {
    session: P_Mutex<GameSession>,
    // 将 PlayerId 映射到具体的网络连接
    members: P_RwLock<HashMap<PlayerId, Member>>,
}

// 房间成员的网络连接信息
struct Member {
    nickname: String,
    // 用于向该成员的 WebSocket 任务发送消息的通道
    sender: mpsc::Sender<ServerMessage>,
}

impl Room {
    fn new(session: GameSession) -> Self {
        Room {
            session: P_Mutex::new(session),
            members: P_RwLock::new(HashMap::new()),
        }
    }

    fn add_member(&self, player_id: PlayerId, nickname: String, sender: mpsc::Sender<ServerMessage>) {
        self.members.write().insert(player_id, Member { nickname, sender });
    }

    /// 移除成员，返回房间是否已空
    fn remove_member(&self, player_id: &PlayerId) -> bool {
        let mut members = self.members.write();
        members.remove(player_id);
        members.is_empty()
    }

    fn nickname(&self, player_id: &PlayerId) -> Option<String> {
        self.members.read().get(player_id).map(|m| m.nickname.clone())
    }

    fn snapshot_for(&self, player_id: &PlayerId) -> GameState {
        self.session.lock().snapshot().for_client(player_id)
    }

    /// 执行一条牌局指令并投递产生的通知。
    /// 被拒绝时什么也不投递，由调用方把错误回复给发指令的人。
    fn dispatch(&self, player_id: PlayerId, command: &ClientMessage) -> Result<(), GameError> {
        let nickname = self.nickname(&player_id).unwrap_or_default();
        let notices = {
            let mut session = self.session.lock();
            match command {
                ClientMessage::Start => session.start(),
                ClientMessage::Join => session.join(player_id, &nickname)?,
                ClientMessage::Deal => session.deal()?,
                ClientMessage::Check => session.check(player_id)?,
                ClientMessage::Fold => session.fold(player_id)?,
                _ => Vec::new(),
            }
        };
        self.deliver_all(notices);
        Ok(())
    }
}

impl NoticeSink for Room {
    fn deliver(&self, notice: Notice) {
        let members = self.members.read();
        let message = ServerMessage::from(notice.event);
        match notice.to {
            Recipient::Room => {
                for (player_id, member) in members.iter() {
                    if member.sender.try_send(message.clone()).is_err() {
                        // 发送失败，说明该玩家已断开或积压过多，后续由其自己的 handle_socket 任务处理
                        warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
                    }
                }
            }
            Recipient::Player(player_id) => match members.get(&player_id) {
                Some(member) => {
                    if member.sender.try_send(message).is_err() {
                        warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
                    }
                }
                None => warn!("玩家 {} 不在房间内，私信被丢弃", player_id),
            },
        }
    }
}

type SharedState = Arc<AppState>;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let config = ServerConfig::parse();
    let addr = config.addr;
    let state = SharedState::new(AppState::new(config));

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    info!("服务器正在监听 {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.channel_capacity);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    // 当前连接的上下文信息，进入房间后填充
    let mut player_context: Option<(RoomId, PlayerId)> = None;

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, &state, &tx, &mut player_context).await;
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                }
            }
        }
    }

    // 客户端断开连接，执行清理工作
    if let Some((room_id, player_id)) = player_context {
        handle_disconnect(&state, room_id, player_id);
    }
    info!("客户端连接关闭");
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: &SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    context: &mut Option<(RoomId, PlayerId)>,
) {
    match msg {
        ClientMessage::CreateRoom { nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::Error { message: "你已经在一个房间里了".to_string() }).await;
                return;
            }

            let room_id = Uuid::new_v4();
            let player_id = Uuid::new_v4();
            let room = Room::new(state.new_session(room_id));
            room.add_member(player_id, nickname, tx.clone());
            state.rooms.insert(room_id, Arc::new(room));

            info!("玩家 {} 创建了新房间 {}", player_id, room_id);
            *context = Some((room_id, player_id));
            let _ = tx.send(ServerMessage::RoomEntered { room_id, your_id: player_id }).await;
        }
        ClientMessage::EnterRoom { room_id, nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::Error { message: "你已经在一个房间里了".to_string() }).await;
                return;
            }

            // 先取出 Arc 再 await，不跨 await 持有 DashMap 的读锁
            let room = state.rooms.get(&room_id).map(|r| r.clone());
            let Some(room) = room else {
                let _ = tx.send(ServerMessage::Error { message: "房间不存在".to_string() }).await;
                return;
            };

            let player_id = Uuid::new_v4();
            room.add_member(player_id, nickname, tx.clone());

            info!("玩家 {} 进入了房间 {}", player_id, room_id);
            *context = Some((room_id, player_id));
            let _ = tx.send(ServerMessage::RoomEntered { room_id, your_id: player_id }).await;
        }
        // 牌局指令，需要先进入房间
        command => {
            let Some((room_id, player_id)) = *context else {
                let _ = tx.send(ServerMessage::Error { message: "请先进入或创建房间".to_string() }).await;
                return;
            };
            let room = state.rooms.get(&room_id).map(|r| r.clone());
            let Some(room) = room else {
                let _ = tx.send(ServerMessage::Error { message: "房间不存在".to_string() }).await;
                return;
            };

            if command == ClientMessage::GetState {
                let snapshot = room.snapshot_for(&player_id);
                let _ = tx.send(ServerMessage::GameStateSnapshot(snapshot)).await;
                return;
            }

            if let Err(e) = room.dispatch(player_id, &command) {
                info!("房间 {} 拒绝了玩家 {} 的指令 {:?}: {}", room_id, player_id, command, e);
                let _ = tx.send(ServerMessage::Declined { message: e.to_string() }).await;
            }
        }
    }
}

/// 成员断开连接后的处理。
/// 已登记的玩家仍留在牌局中；房间空了就整体移除。
fn handle_disconnect(state: &SharedState, room_id: RoomId, player_id: PlayerId) {
    info!("玩家 {} 从房间 {} 断开连接", player_id, room_id);
    let room = match state.rooms.get(&room_id) {
        None => return,
        Some(r) => r.clone(),
    };

    if room.remove_member(&player_id) {
        state.rooms.remove(&room_id);
        info!("房间 {} 已空，已被移除", room_id);
    }
}

// --- 单元测试 ---
