//! Typed wrapper over [`Chain::call`] for one entity.

use keystone_types::{
    Address, Amount, Asset, OfferId, PolicyConfig, Result, SaleOutcome, TradeOutcome,
};

use crate::call::{CallOutput, EntityCall, VersionInfo};
use crate::chain::Chain;

pub struct EntityClient<'c> {
    chain: &'c mut Chain,
    entity: Address,
}

impl<'c> EntityClient<'c> {
    pub fn new(chain: &'c mut Chain, entity: Address) -> Self {
        Self { chain, entity }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.entity
    }

    fn call(&mut self, caller: Address, call: EntityCall) -> Result<CallOutput> {
        self.chain.call(self.entity, caller, call)
    }

    /// Read-only calls go out from the zero address.
    fn view(&mut self, call: EntityCall) -> Result<CallOutput> {
        self.call(Address::ZERO, call)
    }

    // --- ledger ---

    pub fn deposit(&mut self, caller: Address, unit: Asset, amount: Amount) -> Result<()> {
        self.call(caller, EntityCall::Deposit { unit, amount })?;
        Ok(())
    }

    pub fn withdraw(&mut self, caller: Address, unit: Asset, amount: Amount) -> Result<()> {
        self.call(caller, EntityCall::Withdraw { unit, amount })?;
        Ok(())
    }

    pub fn trade(
        &mut self,
        caller: Address,
        sell_unit: Asset,
        sell_amount: Amount,
        buy_unit: Asset,
        min_buy_amount: Amount,
    ) -> Result<TradeOutcome> {
        self.call(
            caller,
            EntityCall::Trade {
                sell_unit,
                sell_amount,
                buy_unit,
                min_buy_amount,
            },
        )?
        .into_trade()
    }

    pub fn sell_at_best_price(
        &mut self,
        caller: Address,
        sell_unit: Asset,
        sell_amount: Amount,
        buy_unit: Asset,
    ) -> Result<SaleOutcome> {
        self.call(
            caller,
            EntityCall::SellAtBestPrice {
                sell_unit,
                sell_amount,
                buy_unit,
            },
        )?
        .into_sale()
    }

    pub fn claim_trade_proceeds(&mut self, caller: Address, offer_id: OfferId) -> Result<Amount> {
        self.call(caller, EntityCall::ClaimTradeProceeds { offer_id })?
            .into_amount()
    }

    pub fn cancel_trade(&mut self, caller: Address, offer_id: OfferId) -> Result<Amount> {
        self.call(caller, EntityCall::CancelTrade { offer_id })?
            .into_amount()
    }

    pub fn pay_tranch_premium(
        &mut self,
        caller: Address,
        policy: Address,
        tranch_index: usize,
        amount: Amount,
    ) -> Result<()> {
        self.call(
            caller,
            EntityCall::PayTranchPremium {
                policy,
                tranch_index,
                amount,
            },
        )?;
        Ok(())
    }

    pub fn balance(&mut self, unit: Asset) -> Result<Amount> {
        self.view(EntityCall::GetBalance { unit })?.into_amount()
    }

    // --- policies / introspection ---

    pub fn create_policy(&mut self, caller: Address, config: PolicyConfig) -> Result<Address> {
        self.call(caller, EntityCall::CreatePolicy(config))?
            .into_address()
    }

    pub fn num_policies(&mut self) -> Result<usize> {
        self.view(EntityCall::GetNumPolicies)?.into_count()
    }

    pub fn policy(&mut self, index: usize) -> Result<Address> {
        self.view(EntityCall::GetPolicy { index })?.into_address()
    }

    pub fn version_info(&mut self) -> Result<VersionInfo> {
        self.view(EntityCall::GetVersionInfo)?.into_version()
    }

    // --- upgrade control ---

    pub fn upgrade(&mut self, caller: Address, modules: Vec<Address>) -> Result<()> {
        self.call(caller, EntityCall::Upgrade { modules })?;
        Ok(())
    }

    pub fn register_facets(&mut self, caller: Address, modules: Vec<Address>) -> Result<()> {
        self.call(caller, EntityCall::RegisterFacets { modules })?;
        Ok(())
    }

    pub fn is_upgrade_frozen(&mut self) -> Result<bool> {
        self.view(EntityCall::IsUpgradeFrozen)?.into_bool()
    }

    /// Served only once the freeze module is installed.
    pub fn freeze_upgrades(&mut self, caller: Address) -> Result<bool> {
        self.call(caller, EntityCall::FreezeUpgrades)?.into_bool()
    }

    pub fn delegate_address(&mut self) -> Result<Address> {
        self.view(EntityCall::GetDelegateAddress)?.into_address()
    }

    /// Call an operation contributed by an installed module.
    pub fn extension(
        &mut self,
        caller: Address,
        signature: &str,
        args: serde_json::Value,
    ) -> Result<CallOutput> {
        self.call(
            caller,
            EntityCall::Extension {
                signature: signature.to_string(),
                args,
            },
        )
    }
}
