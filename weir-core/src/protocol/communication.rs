//! Decides who actually transmits when one protocol reads a value held
//! by another.
//!
//! Reading from a replicated value does not require contacting every
//! replica: it suffices to hear from a subset of hosts whose pooled
//! integrity backs the integrity the value claims. The subsets are tried
//! smallest first, so a value endorsed by a single replica is fetched
//! from that replica alone, while a jointly endorsed value is fetched
//! from every endorser and cross-checked by the reader.

use crate::host::HostTrustConfiguration;
use crate::protocol::Protocol;
use itertools::Itertools;
use std::collections::BTreeSet;
use weir_error::{CompileError, CompileResult};
use weir_types::{HostName, Label, Lattice};

/// The smallest subset of `from`'s hosts whose pooled integrity covers
/// the integrity of `data`. `reader` only labels the error when no
/// subset suffices.
pub fn read_set(
    config: &HostTrustConfiguration,
    from: &Protocol,
    data: &Label,
    reader: &str,
) -> CompileResult<BTreeSet<HostName>> {
    let hosts: Vec<HostName> = from.hosts().into_iter().collect();
    let claim = data.integrity();
    for subset in hosts.iter().powerset().filter(|subset| !subset.is_empty()) {
        let mut pooled: Option<Label> = None;
        for host in &subset {
            let trust = config.trust(host)?.clone();
            pooled = Some(match pooled {
                Some(acc) => acc.meet(&trust),
                None => trust,
            });
        }
        let pooled = pooled
            .ok_or_else(|| CompileError::Internal("empty communication subset".into()))?;
        if pooled.integrity().dominates(&claim) {
            return Ok(subset.into_iter().cloned().collect());
        }
    }
    Err(CompileError::CommunicationUnsatisfiable {
        from_protocol: from.to_string(),
        to: reader.to_string(),
    })
}
