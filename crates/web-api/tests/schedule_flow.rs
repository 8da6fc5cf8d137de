mod support;

use std::time::Duration;

use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot, time::sleep};

use support::{build_router, chat_id_by_name, connect, login, recv_event, send_json};

#[tokio::test]
async fn scheduled_message_delivers_placeholder_then_text() {
    let router = build_router().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    sleep(Duration::from_millis(100)).await;

    let mut matteus = connect(addr).await;
    let mut andrej = connect(addr).await;
    let snapshot = login(&mut matteus, "Vinden4554").await;
    let chat_id = chat_id_by_name(&snapshot, "General Class");
    login(&mut andrej, "6767").await;

    send_json(
        &mut matteus,
        json!({
            "type": "schedule_msg",
            "chatId": chat_id,
            "text": "pop quiz tomorrow",
            "delayMs": 300,
        }),
    )
    .await;

    // 占位消息立即推给全部在线成员，正文是固定提示文案
    let placeholder_for_sender = recv_event(&mut matteus, "new_msg").await;
    assert_eq!(
        placeholder_for_sender["message"]["text"],
        "Scheduled message pending delivery"
    );
    assert_eq!(placeholder_for_sender["message"]["isPlaceholder"], true);
    assert_eq!(placeholder_for_sender["message"]["senderId"], "Vinden4554");

    let placeholder_for_peer = recv_event(&mut andrej, "new_msg").await;
    let placeholder_id = placeholder_for_peer["message"]["id"]
        .as_str()
        .expect("placeholder id")
        .to_owned();
    assert_eq!(
        placeholder_id,
        placeholder_for_sender["message"]["id"].as_str().expect("id")
    );

    // 到期后追加一条全新的消息，占位条目不被替换
    let delivered = recv_event(&mut andrej, "new_msg").await;
    assert_eq!(delivered["message"]["text"], "pop quiz tomorrow");
    assert_eq!(delivered["message"]["isPlaceholder"], false);
    assert_eq!(delivered["message"]["senderName"], "Matteus Aydin");
    assert_ne!(delivered["message"]["id"], placeholder_id.as_str());

    let delivered_for_sender = recv_event(&mut matteus, "new_msg").await;
    assert_eq!(delivered_for_sender["message"]["id"], delivered["message"]["id"]);

    // 历史里占位与正文消息并存，按追加顺序排列
    send_json(
        &mut andrej,
        json!({"type": "get_messages", "chatId": chat_id}),
    )
    .await;
    let history = recv_event(&mut andrej, "history_data").await;
    let messages = history["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["isPlaceholder"], true);
    assert_eq!(messages[1]["text"], "pop quiz tomorrow");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn late_login_receives_promoted_message_only() {
    let router = build_router().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    sleep(Duration::from_millis(100)).await;

    let mut matteus = connect(addr).await;
    let snapshot = login(&mut matteus, "Vinden4554").await;
    let chat_id = chat_id_by_name(&snapshot, "General Class");

    send_json(
        &mut matteus,
        json!({
            "type": "schedule_msg",
            "chatId": chat_id,
            "text": "deadline moved to friday",
            "delayMs": 500,
        }),
    )
    .await;
    recv_event(&mut matteus, "new_msg").await;

    // 收件人按投递时刻的在线会话计算：登记后才上线的成员
    // 错过占位推送，但能收到到期投递
    let mut felix = connect(addr).await;
    login(&mut felix, "1234").await;

    let delivered = recv_event(&mut felix, "new_msg").await;
    assert_eq!(delivered["message"]["text"], "deadline moved to friday");
    assert_eq!(delivered["message"]["isPlaceholder"], false);

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn negative_delay_reports_invalid_argument() {
    let router = build_router().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    sleep(Duration::from_millis(100)).await;

    let mut matteus = connect(addr).await;
    let snapshot = login(&mut matteus, "Vinden4554").await;
    let chat_id = chat_id_by_name(&snapshot, "General Class");

    send_json(
        &mut matteus,
        json!({
            "type": "schedule_msg",
            "chatId": chat_id,
            "text": "never",
            "delayMs": -5,
        }),
    )
    .await;
    let error = recv_event(&mut matteus, "error").await;
    assert_eq!(error["code"], "invalid_argument");
    assert_eq!(error["message"], "delayMs: must not be negative");

    // 校验失败发生在落占位消息之前，历史保持为空
    send_json(
        &mut matteus,
        json!({"type": "get_messages", "chatId": chat_id}),
    )
    .await;
    let history = recv_event(&mut matteus, "history_data").await;
    assert!(history["messages"].as_array().expect("messages").is_empty());

    let _ = shutdown_tx.send(());
}
