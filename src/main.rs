use std::{net::SocketAddr, path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use mediagate::{
    adapters::{HealthChecker, HttpClientAdapter, HttpHandler},
    config::{GatewayConfigValidator, models::GatewayConfig, resolve_shared_secret},
    core::GatewayService,
    ports::http_client::HttpClient,
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Determine the command to run
    let (command, config_path) = match args.command {
        Some(Commands::Validate { config }) => ("validate", config),
        Some(Commands::Init { config }) => ("init", config),
        Some(Commands::Serve { config }) => ("serve", config),
        None => ("serve", args.config), // Default to serve with config from args
    };

    match command {
        "validate" => {
            return validate_config_command(&config_path).await;
        }
        "init" => {
            return init_config_command(&config_path).await;
        }
        "serve" => {
            // Continue with normal server startup
        }
        _ => unreachable!(),
    }

    tracing_setup::init_tracing().map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Loading configuration from {config_path}");
    let config: GatewayConfig = mediagate::config::load_config(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    GatewayConfigValidator::validate(&config)
        .map_err(|e| eyre!("Invalid configuration:\n{}", e))?;

    let config = Arc::new(config);

    // The shared signing secret bridges identity between the gateway and
    // both upstreams. It is optional at the gateway unless a route asks for
    // pre-validation.
    let secret = resolve_shared_secret(&config.auth);
    if secret.is_none() && config.routes.values().any(|r| r.require_auth) {
        return Err(eyre!(
            "a route sets require_auth but no signing secret is available \
             (set {} or auth.secret)",
            config.auth.secret_env
        ));
    }

    let http_client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(&config.upstream_client)
            .context("Failed to create HTTP client adapter")?,
    );

    let gateway_service = Arc::new(GatewayService::new(config.clone(), secret));

    // Upstream reachability probing runs beside the proxy; it feeds /health
    // and never gates routing.
    let health_checker_handle = if config.health_check.enabled {
        let health_checker = HealthChecker::new(gateway_service.clone(), http_client.clone());
        Some(tokio::spawn(async move {
            if let Err(e) = health_checker.run().await {
                tracing::error!("Health checker run error: {}", e);
            }
        }))
    } else {
        tracing::info!("Health checking is disabled by configuration.");
        None
    };

    // Graceful shutdown: stop accepting, then drain in-flight requests for
    // a bounded window.
    let graceful_shutdown = Arc::new(GracefulShutdown::new());

    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let http_handler = Arc::new(HttpHandler::new(
        gateway_service.clone(),
        http_client.clone(),
    ));

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    {
        tracing::info!(
            "Starting mediagate on {} ({} routes, health checks: {})",
            config.listen_addr,
            config.routes.len(),
            config.health_check.enabled
        );

        println!("mediagate listening on {}", config.listen_addr);
        println!("Configured routes:");
        let mut prefixes: Vec<_> = config.routes.iter().collect();
        prefixes.sort_by_key(|(prefix, _)| prefix.as_str());
        for (prefix, rule) in prefixes {
            println!(
                "  {} -> {} [{}]{}",
                prefix,
                rule.upstream,
                rule.service,
                if rule.require_auth { " (auth)" } else { "" }
            );
        }
        println!("Health check: /health");
    }

    use std::convert::Infallible;

    use axum::{
        Router,
        body::Body,
        extract::{ConnectInfo, Request},
        response::Response,
        routing::any,
    };
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    let make_request_route = |handler: Arc<HttpHandler>| {
        any(
            move |ConnectInfo(client_addr): ConnectInfo<SocketAddr>, req: Request| {
                let handler = handler.clone();
                async move {
                    Ok::<Response<Body>, Infallible>(
                        handler.handle_request(req, Some(client_addr)).await,
                    )
                }
            },
        )
    };

    // Browser and mobile clients reach the gateway from arbitrary origins
    // (LAN addresses, hotspots), so CORS is wide open at this layer.
    let app = Router::new()
        .route("/{*path}", make_request_route(http_handler.clone()))
        .route("/", make_request_route(http_handler.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("mediagate server starting on {}", addr);

    let shutdown_for_server = graceful_shutdown.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_for_server.wait_for_shutdown_signal().await;
    });

    let drain_window = graceful_shutdown.drain_window();
    let shutdown_for_drain = graceful_shutdown.clone();

    tokio::select! {
        result = server => {
            result.context("Server error")?;
            tracing::info!("All in-flight requests drained");
        }
        _ = async {
            shutdown_for_drain.wait_for_shutdown_signal().await;
            tokio::time::sleep(drain_window).await;
        } => {
            tracing::warn!(
                "Drain window of {:?} expired with requests still in flight; forcing exit",
                drain_window
            );
        }
    }

    if let Some(handle) = health_checker_handle {
        tracing::info!("Shutting down health checker...");
        handle.abort();
    }

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    use mediagate::config::{GatewayConfigValidator, loader::load_config};

    println!("🔍 Validating configuration file: {config_path}");

    // First check if file exists and is readable
    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    // Try to parse the configuration
    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    // Validate the configuration
    match GatewayConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Routes: {}", config.routes.len());
            println!("   • Body Limit: {} bytes", config.limits.max_body_bytes);
            println!("   • Health Checks: {}", config.health_check.enabled);
            println!("   • Secret Source: ${}", config.auth.secret_env);
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure all upstream URLs start with http:// or https://");
            println!("   • Verify listen address format (e.g., '127.0.0.1:3000')");
            println!("   • Every route needs an upstream and a service name");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# mediagate configuration

# The address to listen on
listen_addr = "0.0.0.0:3000"

# Fallback base URL for embedded URL resolvers (requests with no
# forwarded context)
# public_base_url = "http://localhost:3000"

# Shared signing secret: the named environment variable must hold the same
# value in the identity service and the media service
[auth]
secret_env = "JWT_SIGNING_KEY"

[limits]
# 100 MiB upload cap
max_body_bytes = 104857600

[upstream_client]
connect_timeout_secs = 5
read_timeout_secs = 30

[health_check]
enabled = true
interval_secs = 10
timeout_secs = 5
path = "/health"

# Identity service: Django-style routes, trailing slashes everywhere
[routes."/api/auth"]
upstream = "http://127.0.0.1:8000"
service = "identity"
preserve_trailing_slash = true

# Media service API: no trailing slashes
[routes."/api/media"]
upstream = "http://127.0.0.1:8001"
service = "media"

# Stored media files, served through the gateway with auth preserved
[routes."/media"]
upstream = "http://127.0.0.1:8001"
service = "media"
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'mediagate serve --config {config_path}' to start the gateway");
    Ok(())
}
