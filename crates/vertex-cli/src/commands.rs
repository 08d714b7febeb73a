//! CLI command implementations.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vertex_crypto::Keypair;
use vertex_orchestrator::{NetworkConfig, Topology};

/// Transaction payload carried by every signer's chain in this CLI's
/// single-process network. A real deployment would plug in an
/// application-specific payload type here; the orchestrator itself is
/// generic over it.
pub type Payload = u64;

fn load_network_config(path: &Path) -> Result<NetworkConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading bootstrap config {}", path.display()))?;
    let config = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&raw).context("parsing bootstrap config as JSON")?
    } else {
        serde_yaml::from_str(&raw).context("parsing bootstrap config as YAML")?
    };
    Ok(config)
}

/// Validates a bootstrap config file without starting a network.
pub fn check(path: &Path) -> Result<()> {
    let config = load_network_config(path)?;
    config.validate().map_err(|e| anyhow!(e))?;

    println!("{} is valid:", path.display());
    println!("  nodes:                      {}", config.nodes.len());
    println!("  signers:                    {}", config.signer_ids().len());
    println!("  block production interval: {}ms", config.block_production_interval_ms);
    println!("  health check interval:      {}ms", config.health_check_interval_ms);
    Ok(())
}

/// Loads a bootstrap config, builds the network it describes, and
/// runs its block-production, health-check, and ping ticks until the
/// process receives `Ctrl+C`.
pub async fn run(path: &Path, max_transactions: usize, mempool_capacity: usize) -> Result<()> {
    let config = load_network_config(path)?;
    tracing::info!(config = %path.display(), nodes = config.nodes.len(), "loaded bootstrap config");

    let block_interval = config.block_production_interval();
    let health_interval = config.health_check_interval();

    let network: vertex_orchestrator::Network<Payload> =
        vertex_orchestrator::Network::build(config, mempool_capacity)
            .map_err(|e| anyhow!(e))
            .context("building network from bootstrap config")?;
    network.apply_topology(Topology::Mesh, None);

    tracing::info!("network running; press Ctrl+C to stop");

    let mut block_ticker = tokio::time::interval(block_interval);
    let mut health_ticker = tokio::time::interval(health_interval);
    let mut ping_ticker = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            _ = block_ticker.tick() => {
                let now = now_ms();
                network.run_block_production_tick(now, max_transactions).await;
            }
            _ = health_ticker.tick() => {
                network.run_health_tick(now_ms() as i64, vertex_orchestrator::DEFAULT_STALE_AFTER_MS);
            }
            _ = ping_ticker.tick() => {
                network.run_ping_tick().await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generates a new secp256k1 keypair, printing its public key and
/// optionally writing the hex-encoded secret key to `output`.
pub fn identity_generate(output: Option<&Path>) -> Result<()> {
    let keypair = Keypair::generate();
    let public_key = keypair.public_key();

    println!("Generated new identity:");
    println!("  Public Key: {public_key}");
    println!("  Short ID:   {}", public_key.short_id());

    if let Some(output_path) = output {
        let secret_bytes = keypair.secret_bytes();
        let hex_secret = hex::encode(&*secret_bytes);

        std::fs::write(output_path, &hex_secret)?;
        println!("\nSecret key saved to: {}", output_path.display());
        println!("WARNING: keep this file secure; it is the only copy of the private key.");
    }

    Ok(())
}

/// Reads a hex-encoded secret key from `path` and prints its derived
/// public key, without ever printing the secret itself.
pub fn identity_show(path: &Path) -> Result<()> {
    let hex_secret = std::fs::read_to_string(path)
        .with_context(|| format!("reading secret key file {}", path.display()))?;
    let bytes = hex::decode(hex_secret.trim()).context("secret key file is not valid hex")?;
    let keypair = Keypair::from_secret_bytes(&bytes).map_err(|e| anyhow!(e))?;

    println!("Public Key: {}", keypair.public_key());
    println!("Short ID:   {}", keypair.public_key().short_id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn identity_generate_then_show_round_trips_the_public_key() {
        let temp = TempDir::new().unwrap();
        let key_path: PathBuf = temp.path().join("secret.hex");

        identity_generate(Some(&key_path)).unwrap();
        assert!(key_path.exists());
        identity_show(&key_path).unwrap();
    }

    #[test]
    fn check_rejects_a_config_with_no_nodes() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("empty.yaml");
        std::fs::write(&config_path, "nodes: []\nblock_production_interval_ms: 2000\n").unwrap();

        assert!(check(&config_path).is_err());
    }

    #[test]
    fn check_accepts_a_well_formed_single_node_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("one.yaml");
        std::fs::write(
            &config_path,
            r#"
nodes:
  - id: s1
    type: signer
    private_key_env: VERTEX_TEST_S1
    peers: []
    port: 9001
    host: 127.0.0.1
    is_bootstrap: true
block_production_interval_ms: 2000
health_check_interval_ms: 5000
"#,
        )
        .unwrap();

        check(&config_path).unwrap();
    }
}
