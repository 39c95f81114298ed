//! Named scenarios a load test can run per iteration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::behavior::{BehaviorConfig, VirtualUser, WalkSummary};
use crate::client::ApiClient;
use crate::corpus::QueryCorpus;
use crate::random::RandomSource;
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Landing page, then searches and result pages until the user leaves.
    #[default]
    BasicSearchBrowse,
    /// One search per iteration. Useful as a smoke test.
    SingleSearch,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::BasicSearchBrowse, Scenario::SingleSearch];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::BasicSearchBrowse => "basic-search-browse",
            Scenario::SingleSearch => "single-search",
        }
    }

    /// Run one iteration as a fresh virtual user.
    pub async fn run<R: RandomSource>(
        &self,
        client: &dyn ApiClient,
        target: &Target,
        queries: &QueryCorpus,
        behavior: &BehaviorConfig,
        rng: R,
    ) -> WalkSummary {
        let user = VirtualUser::new(client, target, queries, behavior, rng);
        match self {
            Scenario::BasicSearchBrowse => user.run().await,
            Scenario::SingleSearch => user.search_once().await,
        }
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase().replace('_', "-");
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == name)
            .ok_or_else(|| {
                let known: Vec<_> = Scenario::ALL.iter().map(Scenario::name).collect();
                anyhow::anyhow!("Unknown scenario '{}' (known: {})", s, known.join(", "))
            })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
