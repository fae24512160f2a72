//! bpcluster Configuration
//!
//! Static node, chain and BP membership configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::cluster::{Member, MemberId, PeerId};

/// Main bpcluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpClusterConfig {
    /// Local node configuration
    pub node: NodeConfig,

    /// Chain identity
    pub chain: ChainConfig,

    /// Raft cluster configuration
    pub cluster: ClusterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// BP name of this node, must match one of `cluster.bps`
    pub name: String,

    /// Network peer ID of this node
    pub peer_id: String,
}

/// Chain identity used to derive member IDs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain ID
    pub id: String,

    /// Genesis timestamp
    #[serde(default)]
    pub timestamp: i64,
}

/// Raft cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Total number of BPs (0 = number of `bps`)
    #[serde(default)]
    pub size: u16,

    /// Initial block producers
    #[serde(default)]
    pub bps: Vec<BpConfig>,
}

/// One configured block producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpConfig {
    /// BP name
    pub name: String,

    /// Raft endpoint URL (http:// or https://)
    pub url: String,

    /// Network peer ID
    pub peer_id: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Accepted values of `logging.level`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl BpClusterConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: BpClusterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.name.is_empty() {
            return Err(crate::Error::Config("node.name cannot be empty".into()));
        }

        if self.node.peer_id.is_empty() {
            return Err(crate::Error::Config("node.peer_id cannot be empty".into()));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(crate::Error::Config(format!(
                "logging.level must be one of {:?}, got {}",
                LOG_LEVELS, self.logging.level
            )));
        }

        if self.chain.id.is_empty() {
            return Err(crate::Error::Config("chain.id cannot be empty".into()));
        }

        if self.cluster.bps.is_empty() {
            return Err(crate::Error::Config("cluster.bps cannot be empty".into()));
        }

        if usize::from(self.cluster_size()) < self.cluster.bps.len() {
            return Err(crate::Error::Config(format!(
                "cluster.size {} is smaller than the number of bps {}",
                self.cluster.size,
                self.cluster.bps.len()
            )));
        }

        let mut names = HashSet::new();
        for bp in &self.cluster.bps {
            Member::new(MemberId(0), bp.name.as_str(), bp.url.as_str(), PeerId::new(bp.peer_id.as_str()))
                .validate()?;
            names.insert(bp.name.as_str());
        }

        if !names.contains(self.node.name.as_str()) {
            return Err(crate::Error::Config(format!(
                "node.name {} is not one of cluster.bps",
                self.node.name
            )));
        }

        Ok(())
    }

    /// Log level to start with: the command line wins over `logging.level`
    pub fn log_level<'a>(&'a self, cli_level: Option<&'a str>) -> &'a str {
        cli_level.unwrap_or(&self.logging.level)
    }

    /// Configured cluster size, defaulting to the number of BPs
    pub fn cluster_size(&self) -> u16 {
        if self.cluster.size > 0 {
            self.cluster.size
        } else {
            u16::try_from(self.cluster.bps.len()).unwrap_or(u16::MAX)
        }
    }

    /// Sample configuration for a three-BP cluster
    pub fn sample(node_name: &str) -> Self {
        let bps: Vec<BpConfig> = (1..=3)
            .map(|n| BpConfig {
                name: format!("bp{}", n),
                url: format!("http://127.0.0.1:{}", 10000 + n),
                peer_id: format!("16Uiu2HAkxSample{}", n),
            })
            .collect();
        let peer_id = bps
            .iter()
            .find(|bp| bp.name == node_name)
            .map(|bp| bp.peer_id.clone())
            .unwrap_or_default();

        Self {
            node: NodeConfig {
                name: node_name.to_string(),
                peer_id,
            },
            chain: ChainConfig {
                id: "bpcluster.testnet".to_string(),
                timestamp: 0,
            },
            cluster: ClusterConfig { size: 3, bps },
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML: &str = r#"
[node]
name = "bp1"
peer_id = "16Uiu2HAmP1"

[chain]
id = "testnet.aergo.io"
timestamp = 1600000000

[[cluster.bps]]
name = "bp1"
url = "http://127.0.0.1:10001"
peer_id = "16Uiu2HAmP1"

[[cluster.bps]]
name = "bp2"
url = "http://127.0.0.1:10002"
peer_id = "16Uiu2HAmP2"

[[cluster.bps]]
name = "bp3"
url = "http://127.0.0.1:10003"
peer_id = "16Uiu2HAmP3"
"#;

    #[test]
    fn test_parse_config() {
        let config = BpClusterConfig::from_str(TOML).unwrap();
        assert_eq!(config.node.name, "bp1");
        assert_eq!(config.chain.timestamp, 1_600_000_000);
        assert_eq!(config.cluster.bps.len(), 3);
        assert_eq!(config.cluster_size(), 3); // size defaults to the bp count
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TOML.as_bytes()).unwrap();

        let config = BpClusterConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cluster.bps[2].name, "bp3");
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let unknown_node = TOML.replace("name = \"bp1\"\npeer_id", "name = \"bp9\"\npeer_id");
        assert!(matches!(
            BpClusterConfig::from_str(&unknown_node),
            Err(crate::Error::Config(_))
        ));

        let bad_url = TOML.replace("http://127.0.0.1:10002", "127.0.0.1:10002");
        assert!(matches!(
            BpClusterConfig::from_str(&bad_url),
            Err(crate::Error::InvalidMember { .. })
        ));

        let small = TOML.replace("[[cluster.bps]]\nname = \"bp1\"", "[cluster]\nsize = 2\n\n[[cluster.bps]]\nname = \"bp1\"");
        assert!(matches!(BpClusterConfig::from_str(&small), Err(crate::Error::Config(_))));

        assert!(matches!(
            BpClusterConfig::from_str("[node]\nname = 1"),
            Err(crate::Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_logging_level() {
        let config = BpClusterConfig::from_str(TOML).unwrap();
        assert_eq!(config.log_level(None), "info");
        assert_eq!(config.log_level(Some("trace")), "trace");

        let debug = format!("{}\n[logging]\nlevel = \"debug\"\n", TOML);
        let config = BpClusterConfig::from_str(&debug).unwrap();
        assert_eq!(config.log_level(None), "debug");
        assert_eq!(config.log_level(Some("warn")), "warn");

        let bogus = format!("{}\n[logging]\nlevel = \"loud\"\n", TOML);
        assert!(matches!(BpClusterConfig::from_str(&bogus), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_sample_round_trips() {
        let sample = BpClusterConfig::sample("bp2");
        let text = toml::to_string_pretty(&sample).unwrap();
        let parsed = BpClusterConfig::from_str(&text).unwrap();
        assert_eq!(parsed.node.peer_id, "16Uiu2HAkxSample2");
        assert_eq!(parsed.cluster_size(), 3);
    }
}
