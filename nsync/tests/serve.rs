mod support;

use std::{sync::Arc, time::Duration};

use nsync::{lifecycle, serve, AppState};
use support::{scheduler_with, FakeSynchronizer};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::oneshot,
    time::timeout,
};
use tokio_cron_scheduler::JobScheduler;

const DEADLINE: Duration = Duration::from_secs(10);

async fn get_status(addr: std::net::SocketAddr) -> anyhow::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"GET /api/status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

#[tokio::test]
async fn failed_bootstrap_stops_the_server() -> anyhow::Result<()> {
    let fake = FakeSynchronizer::immediate();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let bootstrap = async { Err::<JobScheduler, _>(anyhow::anyhow!("scheduler unavailable")) };

    let outcome = timeout(
        DEADLINE,
        serve(
            listener,
            AppState::new(scheduler_with(&fake)),
            bootstrap,
            std::future::pending::<()>(),
        ),
    )
    .await?;

    let err = outcome.expect_err("bootstrap failure must end serving");
    let rendered = format!("{err:#}");
    assert!(rendered.contains("bootstrap failed"));
    assert!(rendered.contains("scheduler unavailable"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn server_runs_until_shutdown_after_bootstrap() -> anyhow::Result<()> {
    let fake = FakeSynchronizer::immediate();
    let scheduler = scheduler_with(&fake);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(serve(
        listener,
        AppState::new(Arc::clone(&scheduler)),
        lifecycle::bootstrap(Arc::clone(&scheduler)),
        async move {
            let _ = stopped.await;
        },
    ));

    timeout(DEADLINE, async {
        while fake.calls().len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    let response = get_status(addr).await?;
    assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {response}");
    assert!(response.contains("\"last_summary\""));

    let _ = stop.send(());
    timeout(DEADLINE, server).await??.expect("clean shutdown");
    Ok(())
}
