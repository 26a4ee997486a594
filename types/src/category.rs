//! Task and proof categories.
//!
//! A task's category determines which kind of proof a completion must
//! carry, which in turn determines which registered verifier the
//! Verification Gateway dispatches the proof to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of promotional task an advertiser can create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCategory {
    /// Execute a token swap.
    Swap,
    /// Bridge assets across chains.
    Bridge,
    /// Social-platform action (post, follow, retweet).
    Social,
    /// Interact with a DeFi protocol.
    Defi,
    /// Mint or trade an NFT.
    Nft,
    /// Advertiser-defined criteria.
    Custom,
}

impl TaskCategory {
    /// The proof category a completion of this task must submit.
    pub fn proof_category(&self) -> ProofCategory {
        match self {
            TaskCategory::Swap | TaskCategory::Bridge | TaskCategory::Defi | TaskCategory::Nft => {
                ProofCategory::OnChainTx
            }
            TaskCategory::Social => ProofCategory::SocialPost,
            TaskCategory::Custom => ProofCategory::Custom,
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskCategory::Swap => "swap",
            TaskCategory::Bridge => "bridge",
            TaskCategory::Social => "social",
            TaskCategory::Defi => "defi",
            TaskCategory::Nft => "nft",
            TaskCategory::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// The kind of evidence a verifier knows how to check.
///
/// The Gateway keeps an explicit verifier registry keyed by this variant —
/// a tagged union, not an integer-indexed array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofCategory {
    /// An on-chain transaction hash.
    OnChainTx,
    /// An off-chain social-platform artifact (post URL, handle).
    SocialPost,
    /// An off-chain code-host artifact (PR, commit, star).
    CodeHost,
    /// An off-chain chat-platform artifact (membership, message).
    ChatMembership,
    /// Advertiser-defined proof checked by a custom verifier.
    Custom,
}

impl fmt::Display for ProofCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProofCategory::OnChainTx => "onchain-tx",
            ProofCategory::SocialPost => "social-post",
            ProofCategory::CodeHost => "code-host",
            ProofCategory::ChatMembership => "chat-membership",
            ProofCategory::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_task_category_maps_to_a_proof_category() {
        let all = [
            TaskCategory::Swap,
            TaskCategory::Bridge,
            TaskCategory::Social,
            TaskCategory::Defi,
            TaskCategory::Nft,
            TaskCategory::Custom,
        ];
        for cat in all {
            // The mapping is total; this would fail to compile otherwise,
            // but pin the on-chain grouping explicitly.
            let proof = cat.proof_category();
            match cat {
                TaskCategory::Social => assert_eq!(proof, ProofCategory::SocialPost),
                TaskCategory::Custom => assert_eq!(proof, ProofCategory::Custom),
                _ => assert_eq!(proof, ProofCategory::OnChainTx),
            }
        }
    }
}
