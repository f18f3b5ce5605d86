use alloy_sol_types::sol;

/// Name of the contract as it appears in the Foundry project and its artifacts.
pub const CONTRACT_NAME: &str = "MyEpicNFT";

sol! {
    /// MyEpicNFT mints a fresh token to the caller on every `makeAnEpicNFT` call.
    #[derive(Debug, PartialEq, Eq)]
    interface IMyEpicNFT {
        /// Mint the next token id to `msg.sender`.
        function makeAnEpicNFT() external;

        /// Number of tokens minted so far.
        function totalMinted() external view returns (uint256);

        function ownerOf(uint256 tokenId) external view returns (address);

        event NewEpicNFTMinted(address indexed sender, uint256 indexed tokenId);
    }
}
