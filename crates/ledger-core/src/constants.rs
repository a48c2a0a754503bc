pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Number of leading `0` hex characters a block digest needs to be accepted.
pub const POW_PREFIX_ZEROS: usize = 4;
/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";
