use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

const SHOPS: &[&str] = &["conad", "tigre", "gros"];
const CODES: &[i64] = &[1, 2, 3, 6, 4, 99];

fn fast_random(seed: &mut u64) -> u64 {
    *seed ^= *seed << 13;
    *seed ^= *seed >> 7;
    *seed ^= *seed << 17;
    *seed
}

struct BenchmarkStats {
    total_events: usize,
    alerts: usize,
    total_duration: Duration,
    latencies: Vec<Duration>,
}

impl BenchmarkStats {
    fn events_per_sec(&self) -> f64 {
        self.total_events as f64 / self.total_duration.as_secs_f64()
    }

    fn avg_latency(&self) -> Duration {
        let sum: Duration = self.latencies.iter().sum();
        sum / self.latencies.len().max(1) as u32
    }

    fn percentile(&self, pct: usize) -> Duration {
        let mut sorted = self.latencies.clone();
        sorted.sort();
        sorted
            .get(sorted.len() * pct / 100)
            .or_else(|| sorted.last())
            .copied()
            .unwrap_or_default()
    }
}

async fn run_worker(
    client: Client,
    url: String,
    events: usize,
    mut seed: u64,
) -> Result<(Vec<Duration>, usize), reqwest::Error> {
    let mut latencies = Vec::with_capacity(events);
    let mut alerts = 0;

    for _ in 0..events {
        let shop = SHOPS[fast_random(&mut seed) as usize % SHOPS.len()];
        let code = CODES[fast_random(&mut seed) as usize % CODES.len()].to_string();

        let start = Instant::now();
        let response: Value = client
            .post(&url)
            .form(&[("shop", shop), ("code", code.as_str())])
            .send()
            .await?
            .json()
            .await?;
        latencies.push(start.elapsed());

        if !response["alert"].is_null() {
            alerts += 1;
        }
    }

    Ok((latencies, alerts))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let events_per_worker: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1000);
    let workers: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(8);
    let host = std::env::var("SHOPWATCH_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("SHOPWATCH_PORT").unwrap_or_else(|_| "5000".to_string());
    let base_url = format!("http://{}:{}", host, port);

    println!("Shopwatch Benchmark");
    println!("===================");
    println!("Target:             {}", base_url);
    println!("Events per worker:  {}", events_per_worker);
    println!("Workers:            {}", workers);
    println!("Total events:       {}", events_per_worker * workers);
    println!();

    let client = Client::new();
    let start = Instant::now();

    let handles: Vec<_> = (0..workers)
        .map(|w| {
            tokio::spawn(run_worker(
                client.clone(),
                format!("{}/", base_url),
                events_per_worker,
                12345 + w as u64,
            ))
        })
        .collect();

    let mut latencies = Vec::with_capacity(events_per_worker * workers);
    let mut alerts = 0;
    for handle in handles {
        let (worker_latencies, worker_alerts) = handle.await??;
        latencies.extend(worker_latencies);
        alerts += worker_alerts;
    }

    let stats = BenchmarkStats {
        total_events: latencies.len(),
        alerts,
        total_duration: start.elapsed(),
        latencies,
    };

    println!("  Events/sec:  {:.0}", stats.events_per_sec());
    println!("  Alerts:      {}", stats.alerts);
    println!("  Total time:  {:?}", stats.total_duration);
    println!("  Latency:     avg={:?}", stats.avg_latency());
    println!(
        "  Percentiles: p50={:?} p99={:?}",
        stats.percentile(50),
        stats.percentile(99)
    );
    println!();

    // Print engine stats
    println!("Engine Statistics:");
    let resp: Value = client
        .get(format!("{}/stats", base_url))
        .send()
        .await?
        .json()
        .await?;

    for key in ["events_received", "events_ignored", "events_rejected", "alerts_emitted"] {
        println!("  {}: {}", key, resp[key]);
    }

    Ok(())
}
