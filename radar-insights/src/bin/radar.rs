/// Radar - headless multi-exchange scanner
///
/// Tracks the top USDT pairs on Binance, follows Bybit and OKX for the same symbols and logs
/// the best arbitrage edges and trade ideas every few seconds. Configure with `RADAR_*`
/// environment variables and `RUST_LOG`.
use std::{error::Error, time::Duration};

use radar_insights::{
    config::RadarConfig, radar::Radar, signals::format_price, snapshot::InsightSnapshot,
};
use rustls::crypto::ring::default_provider;
use tracing::info;

const REPORT_INTERVAL: Duration = Duration::from_secs(10);
const REPORT_TOP: usize = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Install default crypto provider for rustls (needed for REST + WSS)
    let _ = default_provider().install_default();

    init_logging();

    let config = RadarConfig::from_env();
    let radar = Radar::start(config)?;

    let mut report = tokio::time::interval(REPORT_INTERVAL);
    // First tick fires immediately, before anything is scored
    report.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                break;
            }
            _ = report.tick() => log_report(&radar, &radar.insights()),
        }
    }

    radar.shutdown().await;
    Ok(())
}

fn log_report(radar: &Radar, snapshot: &InsightSnapshot) {
    let selection = radar.selection();
    let live = radar
        .feed_status()
        .iter()
        .map(|status| format!("{}={}", status.exchange, status.status))
        .collect::<Vec<_>>()
        .join(" ");

    info!(
        universe = radar.universe().len(),
        feeds = %live,
        chart = %format!("{} {} {:?} ({} candles)", selection.symbol, selection.interval, radar.chart_status(), radar.candles().len()),
        "radar status"
    );

    for opportunity in snapshot.opportunities.iter().take(REPORT_TOP) {
        info!(
            symbol = %opportunity.symbol,
            buy = %opportunity.buy_exchange,
            sell = %opportunity.sell_exchange,
            buy_mid = %format_price(opportunity.buy_mid),
            sell_mid = %format_price(opportunity.sell_mid),
            edge_pct = format_args!("{:.3}", opportunity.edge_pct),
            confidence = format_args!("{:.0}%", opportunity.confidence * 100.0),
            "ARB"
        );
    }

    let ideas = snapshot
        .spot_ideas
        .iter()
        .chain(&snapshot.leverage_ideas)
        .chain(&snapshot.prediction_longs)
        .chain(&snapshot.prediction_shorts);

    for idea in ideas {
        info!(
            badge = idea.badge(),
            edge_pct = format_args!("{:.2}", idea.edge_pct),
            confidence = format_args!("{:.0}%", idea.confidence * 100.0),
            meta = %idea.meta(),
            note = %idea.note(),
            "{}",
            idea.title()
        );
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        // Filter messages based on the INFO level
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        // Enable colours
        .with_ansi(true)
        // Use compact formatting for better readability with colored output
        .compact()
        // Install this Tracing subscriber as global default
        .init()
}
