use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use poker_lounge_core::{ClientMessage, RoomId, ServerMessage};

#[derive(Parser, Debug)]
#[command(name = "poker_lounge_client", about = "聊天扑克终端客户端")]
struct ClientConfig {
    /// 服务器 WebSocket 地址
    #[arg(long, default_value = "ws://127.0.0.1:25917/ws")]
    url: Url,
}

/// 把服务器消息渲染成聊天文本
fn render(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::RoomEntered { room_id, your_id } => {
            format!("已进入房间 {} (你的ID: {})", room_id, your_id)
        }
        ServerMessage::Event { text, .. } => text.clone(),
        ServerMessage::GameStateSnapshot(state) => format!("{:#?}", state),
        ServerMessage::Declined { message } => message.clone(),
        ServerMessage::Error { message } => format!("[错误] {}", message),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::parse();

    println!("正在连接到: {}", config.url);
    let (ws_stream, _) = connect_async(config.url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        println!("\n<-- {}", render(&server_msg));
                        print!("> "); // 重新显示输入提示符
                        let _ = std::io::stdout().flush();
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 聊天扑克客户端 ---");
    println!("可用命令:");
    println!("  create <昵称>             - 创建一个新房间");
    println!("  enter <房间ID> <昵称>     - 进入一个房间");
    println!("  /start                    - 开一局新牌局");
    println!("  /join                     - 加入牌局");
    println!("  /deal                     - 发牌");
    println!("  /check                    - 亮牌计分");
    println!("  /fold                     - 弃牌");
    println!("  /state                    - 查看牌局状态");
    println!("  exit                      - 退出");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();

        let client_msg = match parts.first().copied() {
            Some("create") => {
                let nickname = parts.get(1).unwrap_or(&"新玩家").to_string();
                ClientMessage::CreateRoom { nickname }
            }
            Some("enter") => {
                if parts.len() < 3 {
                    println!("用法: enter <房间ID> <昵称>");
                    continue;
                }
                let room_id: RoomId = match parts[1].parse() {
                    Ok(id) => id,
                    Err(_) => {
                        println!("无效的房间ID格式");
                        continue;
                    }
                };
                ClientMessage::EnterRoom { room_id, nickname: parts[2].to_string() }
            }
            Some("exit") => {
                println!("正在断开连接...");
                break;
            }
            Some(command) => match ClientMessage::from_command(command) {
                Some(msg) => msg,
                None => {
                    println!("未知命令: {}", line);
                    continue;
                }
            },
            None => continue,
        };

        let payload = serde_json::to_string(&client_msg)?;
        write.send(Message::Text(payload.into())).await?;
    }

    Ok(())
}
