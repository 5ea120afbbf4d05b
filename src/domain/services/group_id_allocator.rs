use rand::Rng;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::services::instance_selector::select_index;

const SUFFIX_LENGTH: usize = 10;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Pool size above which allocation may take unbounded time.
pub const PRACTICAL_POOL_LIMIT: usize = 256;

/// Mints one group id per instance of a pool of `pool_size`.
///
/// The returned ids are ordered by the instance they select: `ids[i]` lands on
/// instance `i`. Candidates whose index is already claimed are discarded and
/// regenerated until every index has an id.
///
/// Only practical for pools of up to a few hundred instances. The selector's
/// digest sum spans 1536..=3264 and clusters around 2240, so in larger pools
/// some indices are almost never drawn and the loop does not finish.
pub fn generate_group_ids(prefix: &str, pool_size: usize) -> DomainResult<Vec<String>> {
    generate_group_ids_with_rng(prefix, pool_size, &mut rand::thread_rng())
}

pub fn generate_group_ids_with_rng<R: Rng>(
    prefix: &str,
    pool_size: usize,
    rng: &mut R,
) -> DomainResult<Vec<String>> {
    if pool_size == 0 {
        return Err(DomainError::NotFound("No LTI instances were found".to_string()));
    }
    if pool_size > PRACTICAL_POOL_LIMIT {
        tracing::warn!(
            "Allocating group ids for {} instances, above the practical limit of {}",
            pool_size,
            PRACTICAL_POOL_LIMIT
        );
    }

    let mut slots: Vec<Option<String>> = vec![None; pool_size];
    let mut claimed = 0;
    let mut rejected: u64 = 0;

    while claimed < pool_size {
        let candidate = format!("{}_{}", prefix, random_suffix(rng));
        let index = select_index(pool_size, &candidate)?;

        if slots[index].is_none() {
            slots[index] = Some(candidate);
            claimed += 1;
        } else {
            rejected += 1;
        }
    }

    tracing::debug!(
        "Generated {} group ids with prefix '{}' ({} candidates rejected)",
        pool_size,
        prefix,
        rejected
    );

    Ok(slots.into_iter().flatten().collect())
}

fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..SUFFIX_LENGTH)
        .map(|_| char::from(SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())]))
        .collect()
}
