//! metric-rollup demo
//!
//! Usage: `metric-rollup [settings.toml]`
//!
//! Records counter and gauge samples into an in-memory store over several
//! simulated periods, rolls every configured period length up to the open
//! period and prints each aggregate as one JSON line.

use std::sync::Arc;

use futures::TryStreamExt;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use metric_rollup::id::IdGenerator;
use metric_rollup::io::Duration;
use metric_rollup::observability::init_tracing;
use metric_rollup::{
    AggregateOutcome, AggregateStream, AggregateStreamOptions, Clock, Counter, Gauge, InMemoryStore,
    Metric, PeriodLength, Result, RollupSettings, SimulatedClock, Timestamp,
};

const SEED: u64 = 42;
const START_MS: u64 = 1_700_000_000_000;
const SAMPLES: usize = 240;
const SAMPLE_INTERVAL: Duration = Duration(30_000);

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("metric-rollup: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => RollupSettings::from_file(path)?,
        None => RollupSettings::default(),
    };
    init_tracing(&settings.log)?;
    let lengths = settings.period_lengths()?;

    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(SimulatedClock::new(Timestamp::from_millis(START_MS)));
    let metric = |suffix: &str| -> Result<Metric> {
        let prefix = if settings.metric.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}.{suffix}", settings.metric.prefix)
        };
        Ok(Metric::new(store.clone(), settings.metric.clone().with_prefix(prefix))?
            .with_clock(clock.clone())
            .with_id_generator(IdGenerator::seeded(SEED)))
    };
    let requests = Counter::from_metric(metric("requests")?);
    let latency = Gauge::from_metric(metric("latency_ms")?);

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    for _ in 0..SAMPLES {
        requests.add(rng.gen_range(1..=20) as f64).await?;
        latency.set(rng.gen_range(5.0..250.0)).await?;
        clock.advance(SAMPLE_INTERVAL);
    }
    let latest_latency = latency.val().await?;
    tracing::info!(
        samples = SAMPLES,
        now = clock.now().as_millis(),
        ?latest_latency,
        "samples recorded"
    );

    let options = AggregateStreamOptions::new().with_iso();
    for length in lengths {
        let counter_steps = catch_up(|| requests.aggregate(length.as_millis())).await?;
        let gauge_steps = catch_up(|| latency.aggregate(length.as_millis())).await?;
        tracing::info!(%length, counter_steps, gauge_steps, "caught up");

        print_stream(
            "requests",
            length,
            requests.create_aggregate_stream(length.as_millis(), &options)?,
        )
        .await?;
        print_stream(
            "latency_ms",
            length,
            latency.create_aggregate_stream(length.as_millis(), &options)?,
        )
        .await?;
    }
    Ok(())
}

/// Drive one-period steps until the rollup reaches the open period.
async fn catch_up<F, Fut, S>(mut step: F) -> Result<usize>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<AggregateOutcome<S>>>,
{
    let mut written = 0;
    while !step().await?.is_noop() {
        written += 1;
    }
    Ok(written)
}

#[derive(Serialize)]
struct Line<'a, R> {
    metric: &'a str,
    period_length_ms: u64,
    #[serde(flatten)]
    record: R,
}

async fn print_stream<S: Serialize>(
    name: &str,
    length: PeriodLength,
    mut stream: AggregateStream<S>,
) -> Result<()> {
    while let Some(record) = stream.try_next().await? {
        let line = Line {
            metric: name,
            period_length_ms: length.as_millis(),
            record,
        };
        match serde_json::to_string(&line) {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::warn!(error = %err, "skipping unprintable record"),
        }
    }
    Ok(())
}
