use color_eyre::eyre::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, path::Path, time::Duration};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// A party in the network, identified by its id and the address it listens on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParty {
    pub id: usize,
    pub socket_addr: SocketAddr,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub parties: Vec<NetworkParty>,
    pub my_id: usize,
    /// Upper bound for establishing connections and for every single receive.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl NetworkConfig {
    pub fn new(parties: Vec<NetworkParty>, my_id: usize) -> Self {
        Self {
            parties,
            my_id,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Reads the list of parties from a yaml file.
    pub fn from_yaml_file(path: impl AsRef<Path>, my_id: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("while opening network config {}", path.display()))?;
        let parties: Vec<NetworkParty> =
            serde_yaml::from_reader(file).context("while parsing network config")?;
        let config = Self::new(parties, my_id);
        config.check_config()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn get_party(&self, id: usize) -> Option<&NetworkParty> {
        self.parties.iter().find(|p| p.id == id)
    }

    pub fn check_config(&self) -> Result<()> {
        let mut ids = HashSet::with_capacity(self.parties.len());
        for party in self.parties.iter() {
            if party.id >= self.parties.len() {
                bail!("party id {} out of range", party.id);
            }
            if !ids.insert(party.id) {
                bail!("duplicate party id {}", party.id);
            }
        }
        if self.my_id >= self.parties.len() {
            bail!("my_id {} is not part of the network", self.my_id);
        }
        if self.timeout_secs == 0 {
            bail!("timeout must be positive");
        }
        Ok(())
    }
}
