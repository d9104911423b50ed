//! tallyctl against a live daemon on a loopback port.

use assert_cmd::Command;
use predicates::prelude::*;
use tally::Daemon;
use tallyconf::{ServiceEntry, TallyConfig};
use tokio::sync::broadcast;

async fn start_daemon() -> (String, broadcast::Sender<()>) {
    let mut config = TallyConfig::default();
    config.infra.bind.stats_endpoint = "tcp://127.0.0.1:0".to_string();
    config.services.insert(
        "svc-a".to_string(),
        ServiceEntry {
            description: "first service".to_string(),
            ..Default::default()
        },
    );

    let daemon = Daemon::new(config).unwrap();
    let server = daemon.bind().await.unwrap();
    let endpoint = server.endpoint().to_string();

    let (shutdown, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        let _daemon = daemon;
        server.run(shutdown_rx).await
    });

    (endpoint, shutdown)
}

async fn tallyctl(endpoint: &str, args: &[&str]) -> assert_cmd::assert::Assert {
    let endpoint = endpoint.to_string();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("tallyctl")
            .unwrap()
            .env_remove("TALLY_ENDPOINT")
            .arg("--endpoint")
            .arg(endpoint)
            .arg("--timeout-ms")
            .arg("3000")
            .args(args)
            .assert()
    })
    .await
    .unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("tallyctl")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("all-services"))
        .stdout(predicate::str::contains("cache-stats"))
        .stdout(predicate::str::contains("raw"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_info_prints_reply() {
    let (endpoint, shutdown) = start_daemon().await;

    tallyctl(&endpoint, &["info", "--handle", "svc-a", "--compact"])
        .await
        .success()
        .stdout(predicate::str::contains(r#""svc-a":{"#))
        .stdout(predicate::str::contains(r#""description":"first service""#));

    let _ = shutdown.send(());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_reply_exits_non_zero() {
    let (endpoint, shutdown) = start_daemon().await;

    tallyctl(&endpoint, &["raw", r#"{"action":"bogus"}"#])
        .await
        .failure()
        .stdout(predicate::str::contains("UnknownAction"));

    tallyctl(&endpoint, &["info", "--handle", "missing"])
        .await
        .failure()
        .stdout(predicate::str::contains("UnknownHandle"));

    let _ = shutdown.send(());
}
