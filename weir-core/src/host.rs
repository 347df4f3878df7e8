use indexmap::IndexMap;
use weir_error::{CompileError, CompileResult};
use weir_types::{HostName, Label, Principal};

/// The declared hosts of a deployment together with the trust the
/// programmer places in each. Declaration order is preserved and used as
/// the tie-breaking order throughout protocol selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostTrustConfiguration {
    hosts: IndexMap<HostName, Label>,
}

impl HostTrustConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_host(&mut self, host: HostName, trust: Label) -> CompileResult<()> {
        if self.hosts.contains_key(&host) {
            return Err(CompileError::RedeclaredHost { host });
        }
        self.hosts.insert(host, trust);
        Ok(())
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostName> {
        self.hosts.keys()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn trust(&self, host: &HostName) -> CompileResult<&Label> {
        self.hosts.get(host).ok_or_else(|| {
            CompileError::Internal(format!("host \"{host}\" is not declared"))
        })
    }

    /// The principal a host acts as in label formulas.
    pub fn principal(host: &HostName) -> Principal {
        Principal::new(host.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_types::Principal;

    #[test]
    fn redeclaring_a_host_is_an_error() {
        let mut config = HostTrustConfiguration::new();
        let alice = HostName::new("alice");
        let trust = Label::principal(Principal::new("alice"));
        config.add_host(alice.clone(), trust.clone()).unwrap();
        assert_eq!(
            config.add_host(alice.clone(), trust),
            Err(CompileError::RedeclaredHost { host: alice })
        );
    }

    #[test]
    fn declaration_order_is_preserved() {
        let mut config = HostTrustConfiguration::new();
        for name in ["chuck", "alice", "bob"] {
            config
                .add_host(HostName::new(name), Label::principal(Principal::new(name)))
                .unwrap();
        }
        let order: Vec<&str> = config.hosts().map(HostName::as_str).collect();
        assert_eq!(order, vec!["chuck", "alice", "bob"]);
    }
}
