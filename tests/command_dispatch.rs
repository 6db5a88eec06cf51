//! Command routing over a live session.

mod common;

use std::time::Duration;

use common::{FakeIrcServer, TestBot, config, server_entry};
use scumbag_proto::Command;

#[tokio::test]
async fn test_commands_reply_in_channel_and_private() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let bot = TestBot::new(config(&[server_entry(&server.address(), &["#test"], false)])).await;
    bot.supervisor.start_all().await.expect("start");
    let mut peer = server.accept_registered().await.expect("registration");
    peer.expect_join("#test").await.expect("join");

    peer.privmsg_from("bob", "#test", "?version").await.expect("send");
    let (target, text) = peer.expect_privmsg().await.expect("reply");
    assert_eq!(target, "#test");
    assert_eq!(text, scumbag::handlers::version_string());

    peer.privmsg_from("bob", "scumbag", "?help sp").await.expect("send");
    let (target, text) = peer.expect_privmsg().await.expect("reply");
    assert_eq!(target, "bob");
    assert_eq!(text, "?sp <word>");

    bot.supervisor.shutdown_all().await;
    peer.expect_quit().await.expect("quit");
}

#[tokio::test]
async fn test_unknown_command_is_silent() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let bot = TestBot::new(config(&[server_entry(&server.address(), &["#test"], false)])).await;
    bot.supervisor.start_all().await.expect("start");
    let mut peer = server.accept_registered().await.expect("registration");
    peer.expect_join("#test").await.expect("join");

    peer.privmsg_from("bob", "#test", "?frobnicate now").await.expect("send");
    peer.privmsg_from("bob", "#test", "?URL bob").await.expect("send");
    peer.expect_silence(Duration::from_millis(300))
        .await
        .expect("no reply");

    bot.supervisor.shutdown_all().await;
    peer.expect_quit().await.expect("quit");
}

#[tokio::test]
async fn test_non_admin_cannot_change_nick() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let bot = TestBot::new(config(&[server_entry(&server.address(), &["#test"], false)])).await;
    bot.supervisor.start_all().await.expect("start");
    let mut peer = server.accept_registered().await.expect("registration");
    peer.expect_join("#test").await.expect("join");

    peer.privmsg_from("mallory", "#test", "?admin nick evilbot")
        .await
        .expect("send");
    let msg = peer.recv().await.expect("reply");
    assert_eq!(
        msg.command,
        Command::PRIVMSG("#test".into(), "You're not the boss of me.".into())
    );

    peer.privmsg_from("alice", "#test", "?admin nick scumbag2")
        .await
        .expect("send");
    let msg = peer.recv().await.expect("nick change");
    assert_eq!(msg.command, Command::NICK("scumbag2".into()));

    bot.supervisor.shutdown_all().await;
    peer.expect_quit().await.expect("quit");
}
