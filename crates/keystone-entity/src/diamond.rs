//! Module dispatcher.
//!
//! Each entity owns a selector table `Selector -> module Address` plus the
//! reverse set of selectors each module serves. The table is add-only: a
//! selector can be registered once and never replaced or removed. Once the
//! entity is [`UpgradeState::Frozen`] the table is immutable forever.
//!
//! [`dispatch`] resolves the module serving a call and runs it against the
//! entity's own storage.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use keystone_types::{Address, CallId, KeystoneError, Result, Selector, UpgradeFailure};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::call::{CallOutput, EntityCall};
use crate::chain::World;
use crate::facet::CallContext;
use crate::storage::EntityStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeState {
    Unfrozen,
    /// Terminal.
    Frozen,
}

#[derive(Debug, Clone)]
pub struct DiamondState {
    /// The upgrade-control module.
    delegate: Address,
    selectors: BTreeMap<Selector, Address>,
    module_selectors: BTreeMap<Address, BTreeSet<Selector>>,
    state: UpgradeState,
    upgraded_at: DateTime<Utc>,
}

/// One module's contribution to a registration batch.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    pub address: Address,
    pub selectors: Vec<Selector>,
    pub freezes_upgrades: bool,
}

impl DiamondState {
    #[must_use]
    pub fn new(delegate: Address) -> Self {
        Self {
            delegate,
            selectors: BTreeMap::new(),
            module_selectors: BTreeMap::new(),
            state: UpgradeState::Unfrozen,
            upgraded_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn delegate(&self) -> Address {
        self.delegate
    }

    #[must_use]
    pub fn state(&self) -> UpgradeState {
        self.state
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state == UpgradeState::Frozen
    }

    #[must_use]
    pub fn module_for(&self, selector: Selector) -> Option<Address> {
        self.selectors.get(&selector).copied()
    }

    /// Selectors served by `module`.
    pub fn selectors_of(&self, module: Address) -> impl Iterator<Item = Selector> + '_ {
        self.module_selectors
            .get(&module)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn modules(&self) -> impl Iterator<Item = Address> + '_ {
        self.module_selectors.keys().copied()
    }

    #[must_use]
    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    #[must_use]
    pub fn upgraded_at(&self) -> DateTime<Utc> {
        self.upgraded_at
    }

    /// Register a batch atomically. Returns `true` if the batch froze upgrades.
    ///
    /// Fails without changes if frozen, or if any selector is already
    /// registered (to any module) or repeated within the batch.
    pub fn register(&mut self, batch: &[ModuleSpec]) -> Result<bool> {
        if self.is_frozen() {
            return Err(UpgradeFailure::Frozen.into());
        }
        let mut seen = HashSet::new();
        for spec in batch {
            for selector in &spec.selectors {
                if self.selectors.contains_key(selector) || !seen.insert(*selector) {
                    return Err(UpgradeFailure::AddingFunctionsFailed {
                        selector: *selector,
                    }
                    .into());
                }
            }
        }

        let mut freeze = false;
        for spec in batch {
            let served = self.module_selectors.entry(spec.address).or_default();
            for selector in &spec.selectors {
                self.selectors.insert(*selector, spec.address);
                served.insert(*selector);
            }
            freeze |= spec.freezes_upgrades;
        }
        if !batch.is_empty() {
            self.upgraded_at = Utc::now();
        }
        if freeze {
            self.state = UpgradeState::Frozen;
        }
        Ok(freeze)
    }

    /// SHA-256 over the selector table and upgrade state, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"keystone:modules:");
        for (selector, module) in &self.selectors {
            hasher.update(selector.0);
            hasher.update(module.0);
        }
        hasher.update([u8::from(self.is_frozen())]);
        hex::encode(hasher.finalize())
    }
}

/// Resolve deployed modules and register them on `diamond`.
pub(crate) fn install_modules(
    diamond: &mut DiamondState,
    world: &World,
    modules: &[Address],
) -> Result<bool> {
    let mut batch = Vec::with_capacity(modules.len());
    for address in modules {
        let facet = world.facet(*address)?;
        batch.push(ModuleSpec {
            address: *address,
            selectors: facet.selectors(),
            freezes_upgrades: facet.freezes_upgrades(),
        });
    }
    let froze = diamond.register(&batch)?;
    info!(
        modules = modules.len(),
        selectors = diamond.selector_count(),
        frozen = froze,
        "Modules registered"
    );
    Ok(froze)
}

/// Route `call` to the module registered for its selector.
///
/// `getDelegateAddress` is answered by the dispatcher itself.
pub fn dispatch(
    storage: &mut EntityStorage,
    world: &mut World,
    call_id: CallId,
    this: Address,
    caller: Address,
    call: &EntityCall,
) -> Result<CallOutput> {
    if matches!(call, EntityCall::GetDelegateAddress) {
        return Ok(CallOutput::Address(storage.diamond.delegate()));
    }
    let selector = call.selector();
    let module = storage
        .diamond
        .module_for(selector)
        .ok_or(KeystoneError::UnknownOperation(selector))?;
    let facet = world.facet(module)?;
    debug!(
        call = %call_id,
        entity = %this,
        caller = %caller,
        op = call.signature(),
        module = facet.name(),
        "Dispatch"
    );
    let mut ctx = CallContext::new(this, caller, call_id, storage, world);
    facet.execute(&mut ctx, call)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(label: &str, sigs: &[&str], freezes: bool) -> ModuleSpec {
        ModuleSpec {
            address: Address::from_label(label),
            selectors: sigs.iter().map(|s| Selector::of(s)).collect(),
            freezes_upgrades: freezes,
        }
    }

    fn diamond() -> DiamondState {
        DiamondState::new(Address::from_label("delegate"))
    }

    #[test]
    fn register_routes_selectors() {
        let mut d = diamond();
        d.register(&[spec("core", &["a()", "b()"], false)]).unwrap();
        assert_eq!(d.module_for(Selector::of("a()")), Some(Address::from_label("core")));
        assert_eq!(d.selectors_of(Address::from_label("core")).count(), 2);
        assert_eq!(d.modules().count(), 1);
        assert!(d.module_for(Selector::of("c()")).is_none());
    }

    #[test]
    fn re_adding_fails_atomically() {
        let mut d = diamond();
        d.register(&[spec("core", &["a()"], false)]).unwrap();
        let before = d.fingerprint();
        let err = d
            .register(&[spec("other", &["z()"], false), spec("core", &["a()"], false)])
            .unwrap_err();
        assert!(matches!(
            err.upgrade_failure(),
            Some(UpgradeFailure::AddingFunctionsFailed { .. })
        ));
        assert!(d.module_for(Selector::of("z()")).is_none());
        assert_eq!(d.fingerprint(), before);
    }

    #[test]
    fn duplicate_within_batch_fails() {
        let mut d = diamond();
        let err = d
            .register(&[spec("x", &["a()"], false), spec("y", &["a()"], false)])
            .unwrap_err();
        assert!(matches!(
            err.upgrade_failure(),
            Some(UpgradeFailure::AddingFunctionsFailed { .. })
        ));
        assert_eq!(d.selector_count(), 0);
    }

    #[test]
    fn freeze_is_terminal() {
        let mut d = diamond();
        assert!(d.register(&[spec("freeze", &["freeze()"], true)]).unwrap());
        assert!(d.is_frozen());
        let err = d.register(&[spec("x", &["x()"], false)]).unwrap_err();
        assert!(matches!(err.upgrade_failure(), Some(UpgradeFailure::Frozen)));
        assert!(d.register(&[]).is_err());
    }

    #[test]
    fn fingerprint_tracks_table() {
        let mut d = diamond();
        let empty = d.fingerprint();
        d.register(&[spec("core", &["a()"], false)]).unwrap();
        assert_ne!(d.fingerprint(), empty);
        assert_eq!(d.fingerprint().len(), 64);
    }
}
