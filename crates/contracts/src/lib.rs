//! Contract bindings for the NFT deployment runner.

mod epic_nft;

pub use epic_nft::{CONTRACT_NAME, IMyEpicNFT};
