use crate::{pow::hash_is_valid, Block, Hash, MineError};

/// Position a candidate has to move to when the chain grew under it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tip {
    pub index: u64,
    pub previous_hash: Hash,
}

/// Searches nonces upwards from `block.nonce` until `accept` holds for the block hash.
///
/// `rebase` is polled once per attempt; when it yields a new [`Tip`] the
/// candidate is moved onto it and the search carries on from the nonce it had
/// reached. `max_nonce` bounds the search (inclusive); `None` searches the
/// whole `u64` range.
pub fn search<P, R>(
    block: &mut Block,
    accept: P,
    max_nonce: Option<u64>,
    mut rebase: R,
) -> Result<Hash, MineError>
where
    P: Fn(&str) -> bool,
    R: FnMut() -> Option<Tip>,
{
    loop {
        let hash = block.hash();
        if accept(&hash) {
            return Ok(hash);
        }
        if let Some(tip) = rebase() {
            block.index = tip.index;
            block.previous_hash = tip.previous_hash;
        }
        block.nonce = match block.nonce.checked_add(1) {
            Some(next) if max_nonce.map_or(true, |max| next <= max) => next,
            _ => {
                return Err(MineError::NonceExhausted {
                    max_nonce: max_nonce.unwrap_or(u64::MAX),
                })
            }
        };
    }
}

/// Mines `block` against the network target with nothing able to move the tip.
/// Returns the mined block and its hash.
pub fn mine_block(mut block: Block, max_nonce: Option<u64>) -> Result<(Block, Hash), MineError> {
    let hash = search(&mut block, hash_is_valid, max_nonce, || None)?;
    Ok((block, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pow, tests::fixed_genesis, Transaction};
    use std::cell::Cell;

    fn candidate() -> Block {
        Block {
            index: 2,
            timestamp: 1_600_000_100,
            transactions: vec![Transaction::new("tx1")],
            nonce: 0,
            previous_hash: fixed_genesis().hash(),
        }
    }

    #[test]
    fn finds_first_valid_nonce() {
        let (block, hash) = mine_block(candidate(), None).unwrap();
        assert_eq!(block.nonce, 207_788);
        assert_eq!(
            hash,
            "0000db6d34dd43de56027ee9288f45d6b96ea749c8adeb8db5c00a5c74e81955"
        );
        assert_eq!(block.hash(), hash);
        assert!(pow::hash_is_valid(&hash));
    }

    #[test]
    fn custom_predicate_is_honoured() {
        let mut block = candidate();
        let hash = search(&mut block, |h| pow::has_zero_prefix(h, 1), None, || None).unwrap();
        assert!(hash.starts_with('0'));
        assert_eq!(block.hash(), hash);
    }

    #[test]
    fn nonce_cap_stops_the_search() {
        let mut block = candidate();
        let err = search(&mut block, |_| false, Some(10), || None).unwrap_err();
        assert_eq!(err, MineError::NonceExhausted { max_nonce: 10 });
        assert_eq!(block.nonce, 10);
    }

    #[test]
    fn nonce_cap_reports_valid_result_at_the_limit() {
        let (mined, _) = mine_block(candidate(), None).unwrap();
        let result = mine_block(candidate(), Some(mined.nonce));
        assert!(result.is_ok());
        let result = mine_block(candidate(), Some(mined.nonce - 1));
        assert!(result.is_err());
    }

    #[test]
    fn rebase_moves_candidate_and_keeps_nonce() {
        let mut block = candidate();
        let calls = Cell::new(0u32);
        let err = search(&mut block, |_| false, Some(20), || {
            calls.set(calls.get() + 1);
            (calls.get() == 5).then(|| Tip {
                index: 3,
                previous_hash: "feed".into(),
            })
        })
        .unwrap_err();

        assert_eq!(err, MineError::NonceExhausted { max_nonce: 20 });
        assert_eq!(block.index, 3);
        assert_eq!(block.previous_hash, "feed");
        assert_eq!(block.nonce, 20, "nonce is not reset by a rebase");
        assert_eq!(block.transactions, vec![Transaction::new("tx1")]);
    }

    #[test]
    fn empty_block_can_be_mined() {
        let mut block = candidate();
        block.transactions.clear();
        let (mined, hash) = mine_block(block, None).unwrap();
        assert!(mined.transactions.is_empty());
        assert!(pow::hash_is_valid(&hash));
    }
}
