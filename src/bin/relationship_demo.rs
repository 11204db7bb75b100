use rapport::application_port::*;
use rapport::logger::*;
use rapport::server::*;
use rapport::settings::*;

// $ cargo run --bin relationship_demo
// $ RUST_LOG=trace cargo run --bin relationship_demo
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap()?;
    logger.reload_from_config(&LogConfig {
        filter: "debug".to_string(),
    })?;

    let server = Server::try_new(&Settings::in_memory()).await?;

    let mut ids = Vec::new();
    for username in ["alice", "bob", "carol"] {
        let created = server
            .auth_service
            .signup(SignupInput {
                username: username.to_string(),
                password: "correct horse".to_string(),
            })
            .await?;
        ids.push(created.account.id);
    }
    let (alice, bob, carol) = (ids[0], ids[1], ids[2]);
    let relations = &server.relationship_service;

    relations.send_friend_request(alice, bob).await?;
    relations.send_friend_request(carol, bob).await?;
    info!(incoming = relations.list_incoming_requests(bob).await?.len());

    relations.accept_friend_request(bob, alice).await?;
    relations.reject_friend_request(bob, carol).await?;

    // opposite requests collapse into a friendship
    relations.send_friend_request(alice, carol).await?;
    let outcome = relations.send_friend_request(carol, alice).await?;
    info!(?outcome);

    for (name, id) in [("alice", alice), ("bob", bob), ("carol", carol)] {
        let friends: Vec<String> = relations
            .list_friends(id)
            .await?
            .into_iter()
            .map(|a| a.username)
            .collect();
        info!(name, ?friends);
    }

    if let Err(err) = relations.send_friend_request(alice, alice).await {
        info!(%err, "self request");
    }

    let status = relations.relationship_status(bob, carol).await?;
    info!(?status, message = %status.message("carol"));

    server.shutdown().await;
    Ok(())
}
