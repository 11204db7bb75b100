use rapport::api;
use rapport::logger::*;
use rapport::server::*;
use rapport::settings::*;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

fn check_file(kind: &str, path: &str) -> anyhow::Result<()> {
    if !fs::metadata(path)?.is_file() {
        return Err(anyhow::anyhow!("TLS {kind} is not a regular file: {path:?}"));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap()?;

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    let tls = match (
        project_settings.http.cert_path.clone(),
        project_settings.http.key_path.clone(),
    ) {
        (Some(cert_path), Some(key_path)) => {
            check_file("cert", &cert_path)?;
            check_file("key", &key_path)?;
            Some((cert_path, key_path))
        }
        (None, None) => None,
        _ => {
            return Err(anyhow::anyhow!(
                "http.cert_path and http.key_path must be set together"
            ));
        }
    };

    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.clone()))
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not register SIGINT: {}", e);
        }
    };

    match tls {
        Some((cert_path, key_path)) => {
            info!(%address, "serving https");
            warp::serve(api_v1)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .bind_with_graceful_shutdown(address, shutdown)
                .1
                .await;
        }
        None => {
            info!(%address, "serving plain http");
            let (_, serving) = warp::serve(api_v1).try_bind_with_graceful_shutdown(address, shutdown)?;
            serving.await;
        }
    }

    let shutdown_timeout = std::time::Duration::from_secs(100);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
