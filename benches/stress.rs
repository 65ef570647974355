use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{Days, NaiveDate};
use tokio_postgres::{Config, NoTls, SimpleQueryMessage};

const ROOMS: i64 = 7;

async fn connect(host: &str, port: u16, role: &str, password: &str) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname("hotel")
        .user(role)
        .password(password);

    let (client, conn) = config.connect(NoTls).await.expect("connect failed");
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            eprintln!("connection error: {e}");
        }
    });
    client
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

/// The server keeps bookings for its lifetime, so each run books its own
/// far-future window to avoid colliding with earlier runs.
fn run_base_date() -> NaiveDate {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let base = NaiveDate::from_ymd_opt(2100, 1, 1).expect("valid date");
    base.checked_add_days(Days::new((secs % 50_000) * 1_000))
        .expect("date in range")
}

fn day(base: NaiveDate, offset: u64) -> NaiveDate {
    base.checked_add_days(Days::new(offset)).expect("date in range")
}

fn insert_sql(room: i64, guest: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!("INSERT INTO bookings VALUES ({room}, '{guest}', '{start}', '{end}')")
}

async fn phase1_sequential(host: &str, port: u16, password: &str, base: NaiveDate) {
    let client = connect(host, port, "user", password).await;
    let n = 2_000u64;
    let mut latencies = Vec::with_capacity(n as usize);
    let start = Instant::now();
    for i in 0..n {
        let room = (i as i64 % ROOMS) + 1;
        let d = day(base, i / ROOMS as u64);
        let t = Instant::now();
        client
            .simple_query(&insert_sql(room, "seq", d, d))
            .await
            .expect("sequential insert failed");
        latencies.push(t.elapsed());
    }
    let elapsed = start.elapsed();
    println!(
        "  {n} inserts in {:.2}s ({:.0} ops/s)",
        elapsed.as_secs_f64(),
        n as f64 / elapsed.as_secs_f64()
    );
    print_latency("insert", &mut latencies);
}

/// Many clients race for the same stays; exactly one may win each.
async fn phase2_contention(host: &str, port: u16, password: &str, base: NaiveDate) {
    let n_conns = 32;
    let n_slots = 50u64;
    let mut handles = Vec::new();
    let start = Instant::now();

    for c in 0..n_conns {
        let host = host.to_string();
        let password = password.to_string();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port, "user", &password).await;
            let mut won = 0u64;
            for slot in 0..n_slots {
                let s = day(base, slot * 3);
                let e = day(base, slot * 3 + 2);
                if client
                    .simple_query(&insert_sql(1, &format!("racer{c}"), s, e))
                    .await
                    .is_ok()
                {
                    won += 1;
                }
            }
            won
        }));
    }

    let mut total_won = 0;
    for h in handles {
        total_won += h.await.unwrap_or(0);
    }
    println!(
        "  {n_conns} connections x {n_slots} contested stays: {total_won} won in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    if total_won != n_slots {
        println!("  !! expected exactly {n_slots} winners");
    }
}

async fn phase3_list_under_load(host: &str, port: u16, password: &str, base: NaiveDate) {
    let writer_host = host.to_string();
    let writer_password = password.to_string();
    let writer = tokio::spawn(async move {
        let client = connect(&writer_host, port, "user", &writer_password).await;
        for i in 0..1_000u64 {
            let d = day(base, i);
            let _ = client.simple_query(&insert_sql(2, "load", d, d)).await;
        }
    });

    let admin = connect(host, port, "admin", password).await;
    let mut latencies = Vec::new();
    for _ in 0..100 {
        let t = Instant::now();
        admin
            .simple_query("SELECT * FROM bookings")
            .await
            .expect("list failed");
        latencies.push(t.elapsed());
    }
    let _ = writer.await;
    print_latency("list", &mut latencies);
}

/// Every pair of bookings on one room must be day-disjoint.
async fn verify_no_overlaps(host: &str, port: u16, password: &str) {
    let admin = connect(host, port, "admin", password).await;
    let msgs = admin
        .simple_query("SELECT * FROM bookings")
        .await
        .expect("list failed");

    let mut by_room: std::collections::HashMap<String, Vec<(NaiveDate, NaiveDate)>> =
        std::collections::HashMap::new();
    for msg in msgs {
        if let SimpleQueryMessage::Row(row) = msg {
            let room = row.get("room_id").unwrap_or_default().to_string();
            let s: NaiveDate = row.get("start_date").unwrap_or_default().parse().expect("date");
            let e: NaiveDate = row.get("end_date").unwrap_or_default().parse().expect("date");
            by_room.entry(room).or_default().push((s, e));
        }
    }

    let mut violations = 0;
    for stays in by_room.values_mut() {
        stays.sort();
        for pair in stays.windows(2) {
            if pair[1].0 <= pair[0].1 {
                violations += 1;
            }
        }
    }
    let total: usize = by_room.values().map(Vec::len).sum();
    println!("  {total} bookings across {} rooms, {violations} overlaps", by_room.len());
}

#[tokio::main]
async fn main() {
    let host = std::env::var("HOTELBOOK_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("HOTELBOOK_PORT")
        .unwrap_or_else(|_| "5433".into())
        .parse()
        .expect("invalid HOTELBOOK_PORT");
    let password = std::env::var("HOTELBOOK_PASSWORD").unwrap_or_else(|_| "hotelbook".into());

    println!("=== hotelbook stress benchmark ===");
    println!("target: {host}:{port}\n");

    let base = run_base_date();

    println!("[phase 1] sequential create throughput");
    phase1_sequential(&host, port, &password, base).await;

    println!("\n[phase 2] contended creates on one room");
    phase2_contention(&host, port, &password, day(base, 500)).await;

    println!("\n[phase 3] list latency under write load");
    phase3_list_under_load(&host, port, &password, day(base, 700)).await;

    println!("\n[verify]");
    verify_no_overlaps(&host, port, &password).await;

    println!("\n=== benchmark complete ===");
}
