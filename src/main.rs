use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use carpark_fleet::config::{DatabaseConfig, EnvironmentConfig};
use carpark_fleet::database;
use carpark_fleet::repositories::{FleetStore, MemoryFleetStore, PgFleetStore};
use carpark_fleet::routes::create_router;
use carpark_fleet::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚗 Carpark Fleet - Motor de disponibilidad y reservas");
    info!("====================================================");

    let config = match EnvironmentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Configuración inválida: {}", e);
            return Err(anyhow::anyhow!("Error de configuración: {}", e));
        }
    };

    // Elegir store
    let store: Arc<dyn FleetStore> = match &config.database_url {
        Some(url) => {
            let db_config = DatabaseConfig::new(url.clone(), config.store_timeout);
            let pool = match database::connect(&db_config).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            Arc::new(PgFleetStore::new(pool))
        }
        None => {
            if config.is_development() {
                info!("💾 DATABASE_URL no definida, usando store en memoria");
            } else {
                warn!(
                    "⚠️ DATABASE_URL no definida en {}: los datos no sobreviven a un reinicio",
                    config.environment
                );
            }
            Arc::new(MemoryFleetStore::new())
        }
    };

    let app_state = AppState::new(config.clone(), store);
    app_state.bootstrap().await?;

    let app = create_router(app_state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en {} ({})", config.server_url(), config.environment);
    info!("🔍 Endpoints disponibles:");
    info!("   GET    /health - Health check");
    info!("   POST   /api/carparks/search - Buscar disponibilidad");
    info!("   POST   /api/carparks - Crear carpark");
    info!("   GET    /api/carparks?postalCode=|name= - Buscar carparks");
    info!("   GET    /api/carparks/:id - Obtener carpark");
    info!("   DELETE /api/carparks/:id - Eliminar carpark");
    info!("   PUT    /api/carparks/postal-code - Actualizar código postal");
    info!("   POST   /api/carparks/vehicles - Añadir vehículo");
    info!("   DELETE /api/carparks/vehicles - Eliminar vehículo");
    info!("   POST   /api/carparks/schedules - Añadir reserva");
    info!("   DELETE /api/carparks/schedules - Eliminar reserva");
    info!("   POST   /api/carparks/schedules/check - Comprobar disponibilidad");
    info!("   GET    /api/settings - Ajustes de búsqueda");
    info!("   PUT    /api/settings - Actualizar ajustes");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal SIGTERM recibida, apagando servidor...");
        },
    }
}
