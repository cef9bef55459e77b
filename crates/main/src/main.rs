use playone::make_rocket;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                traces_sample_rate: 0.2,
                ..Default::default()
            },
        ))
    });

    if let Err(e) = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .try_init()
    {
        eprintln!("Could not install the tracing subscriber: {e}");
    }

    db::install_query_tracing();

    if let Err(e) = rocket::execute(make_rocket("playone.db").launch()) {
        tracing::error!("Server stopped with an error: {e}");
    }
}
