use std::{error::Error, net::SocketAddr, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use eventstore::ClientSettings;
use tracing::{error, info, Level};
use trainer_booking::{
    domain::schedule::{AppointmentRepository, BusinessCalendar},
    infrastructure::{seed, EventStoreAppointmentRepository, InMemoryAppointmentRepository},
    Backend, TrainerBookingConfig,
};
use trainer_booking_web::{router, AppState};

#[tokio::main]
async fn main() {
    match TrainerBookingConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = serve(&config).await {
                error!("アプリケーションエラー: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("設定の読み込みに失敗しました: {}", error)
        }
    }
}

async fn serve(config: &TrainerBookingConfig) -> Result<(), Box<dyn Error>> {
    let calendar = BusinessCalendar::try_from(&config.calendar)?;
    let max_window = config.calendar.max_window()?;
    let repository: Arc<dyn AppointmentRepository> = match config.storage.backend {
        Backend::Memory => Arc::new(InMemoryAppointmentRepository::new()),
        Backend::EventStore => {
            let url = config
                .storage
                .eventstore_url
                .as_deref()
                .ok_or("storage.eventstore_url is required for the event_store backend")?;
            let settings = url.parse::<ClientSettings>()?;
            Arc::new(EventStoreAppointmentRepository::new(
                eventstore::Client::new(settings)?,
            ))
        }
    };
    if let Some(path) = &config.storage.seed {
        seed::load_seed(repository.as_ref(), path).await?;
    }

    let app = router(
        AppState::new(calendar, config.calendar.blocking, repository).with_max_window(max_window),
    );
    let address = config.server.address.parse::<SocketAddr>()?;
    match &config.server.tls {
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!("HTTPSで待ち受けます: {}", address);
            axum_server::bind_rustls(address, rustls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("HTTPで待ち受けます: {}", address);
            axum_server::bind(address)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}
