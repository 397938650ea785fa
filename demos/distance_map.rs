use hclust::{cluster, ClusterSet, DistanceMap, Method, Threshold, TreeLog};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Cluster five labelled items with a distance cutoff.
    //
    // Usage: cargo run --example distance_map -- [linkage] [threshold]
    // Set RUST_LOG=hclust=debug to see every merge decision.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let method: Method = args.next().as_deref().unwrap_or("complete").parse()?;
    let threshold: f64 = args.next().as_deref().unwrap_or("0.4").parse()?;

    // Only one direction of each pair is given; (b, a) falls back to (a, b).
    let mut set = DistanceMap::try_new([
        ("a", vec![("b", 0.0), ("c", 0.0), ("d", 1.0), ("e", 0.4)]),
        ("b", vec![("c", 0.1), ("d", 0.9), ("e", 0.4)]),
        ("c", vec![("d", 0.9), ("e", 0.2)]),
        ("d", vec![("e", 0.1)]),
    ])?;

    let merges = cluster(&mut set, TreeLog::new(Threshold(threshold)), method.linkage());

    println!(
        "linkage={} threshold={} merges={} clusters={}",
        method,
        threshold,
        merges,
        set.count()
    );
    for (cid, items) in set.clusters().iter().enumerate() {
        println!("  cluster {}: {:?}", cid, items);
    }

    Ok(())
}
