//! Tracing subscriber setup, with optional OpenTelemetry export

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

const DEFAULT_FILTER: &str = "storewatch=info";

/// Install the global subscriber: JSON lines for production, pretty otherwise.
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: `storewatch=info`)
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: storewatch)
pub fn init_tracing(json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().pretty().boxed()
    });

    // Subscriber is not up yet, so report exporter problems after init
    let otel = otel_layer();
    let otel_error = match otel {
        Ok(Some(layer)) => {
            layers.push(layer);
            None
        }
        Ok(None) => None,
        Err(e) => Some(e),
    };

    tracing_subscriber::registry().with(layers).with(env_filter).try_init()?;

    if let Some(e) = otel_error {
        tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }
    Ok(())
}

fn otel_layer() -> Result<Option<BoxedLayer>> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };

    #[cfg(feature = "telemetry")]
    {
        build_otel_layer(&endpoint).map(Some)
    }

    #[cfg(not(feature = "telemetry"))]
    {
        Err(anyhow::anyhow!(
            "OTEL_EXPORTER_OTLP_ENDPOINT={} is set but the 'telemetry' feature is not enabled",
            endpoint
        ))
    }
}

#[cfg(feature = "telemetry")]
fn build_otel_layer(endpoint: &str) -> Result<BoxedLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "storewatch".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}
