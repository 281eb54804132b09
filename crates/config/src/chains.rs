/// Ethereum Mainnet
pub const MAINNET: u64 = 1;
/// Sepolia Testnet
pub const SEPOLIA: u64 = 11155111;
/// Holesky Testnet
pub const HOLESKY: u64 = 17000;
/// Optimism Mainnet
pub const OPTIMISM: u64 = 10;
/// Base Mainnet
pub const BASE: u64 = 8453;
/// Arbitrum One
pub const ARBITRUM: u64 = 42161;
/// Local development chain id used by most dev nodes
pub const DEVNET: u64 = 1337;
