use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing_subscriber::EnvFilter;

use memotable::{Cache, MemoTable, Source};

struct SlowSquares;

#[async_trait]
impl Source<u64, u64> for SlowSquares {
    async fn fetch(&self, key: &u64) -> anyhow::Result<u64> {
        println!("[Fetch] key: {}", key);
        sleep(Duration::from_millis(200)).await;
        key.checked_mul(*key)
            .ok_or_else(|| anyhow::anyhow!("{key} squared overflows"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let table: MemoTable = MemoTable::new();
    let greeting = table.get_or_compute("greeting".to_string(), || {
        println!("[Compute] greeting");
        "Hello".to_string()
    });
    let again = table.get_or_compute("greeting".to_string(), || unreachable!());
    println!("{greeting} / {again}");

    let cache = Arc::new(Cache::new(SlowSquares));
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&12).await })
        })
        .collect();
    for handle in handles {
        println!("[Get] 12 -> {}", handle.await??);
    }

    if let Err(err) = cache.get(&u64::MAX).await {
        println!("[Error] {err:#}");
    }

    Ok(())
}
