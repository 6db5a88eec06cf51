//! End-to-end link archiving over a live session.

mod common;

use std::time::Duration;

use common::{FakeIrcServer, Peer, TestBot, config, server_entry};

async fn connected_bot() -> (FakeIrcServer, TestBot, Peer) {
    let server = FakeIrcServer::bind().await.expect("bind");
    let bot = TestBot::new(config(&[server_entry(&server.address(), &["#test"], false)])).await;
    bot.supervisor.start_all().await.expect("start");
    let mut peer = server.accept_registered().await.expect("registration");
    peer.expect_join("#test").await.expect("join");
    (server, bot, peer)
}

async fn wait_for_links(bot: &TestBot, expected: i64) {
    for _ in 0..100 {
        if bot.state.db.links().count().await.expect("count") == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {expected} links");
}

#[tokio::test]
async fn test_duplicate_link_is_stored_once() {
    let (server, bot, mut peer) = connected_bot().await;

    peer.privmsg_from("bob", "#test", "look http://example.com/x")
        .await
        .expect("send");
    wait_for_links(&bot, 1).await;
    peer.privmsg_from("bob", "#test", "again http://example.com/x")
        .await
        .expect("send");

    peer.privmsg_from("carol", "#test", "?url bob").await.expect("send");
    let (target, text) = peer.expect_privmsg().await.expect("reply");
    assert_eq!(target, "#test");
    assert_eq!(text, "http://example.com/x");
    assert_eq!(bot.state.db.links().count().await.expect("count"), 1);

    let links = bot
        .state
        .db
        .links()
        .by_nick("bob", &server.address(), "#test")
        .await
        .expect("query");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].nick, "bob");

    bot.supervisor.shutdown_all().await;
    peer.expect_quit().await.expect("quit");
}

#[tokio::test]
async fn test_ignored_nick_links_are_not_stored() {
    let (server, bot, mut peer) = connected_bot().await;

    peer.privmsg_from("alice", "#test", "?admin ignore spammer")
        .await
        .expect("send");
    assert_eq!(
        peer.expect_privmsg().await.expect("reply").1,
        "Ignoring: spammer"
    );
    assert!(
        bot.state
            .db
            .ignores()
            .is_ignored(&server.address(), "spammer")
            .await
            .expect("query")
    );

    peer.privmsg_from("spammer", "#test", "buy http://spam.example/now")
        .await
        .expect("send");
    peer.privmsg_from("bob", "#test", "https://i.imgur.com/cat.png")
        .await
        .expect("send");
    wait_for_links(&bot, 1).await;

    peer.privmsg_from("carol", "#test", "?url /imgur/").await.expect("send");
    assert_eq!(
        peer.expect_privmsg().await.expect("reply").1,
        "https://i.imgur.com/cat.png"
    );
    peer.privmsg_from("carol", "#test", "?url spammer").await.expect("send");
    assert_eq!(peer.expect_privmsg().await.expect("reply").1, "No links found.");

    bot.supervisor.shutdown_all().await;
    peer.expect_quit().await.expect("quit");
}
