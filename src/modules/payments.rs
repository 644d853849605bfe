//! Merchant balance ledger living in shared state.
//!
//! Every call carries a JSON payload after the selector. Balances are kept
//! under `payments/merchant/<id>` so other modules can read them.

use crate::domain::identity::Selector;
use crate::domain::ports::{HandlerFault, HandlerModule};
use crate::domain::state::{ExecutionContext, SharedState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, SubAssign};

pub const DEPOSIT_SIGNATURE: &str = "deposit(uint16,decimal)";
pub const WITHDRAW_SIGNATURE: &str = "withdraw(uint16,decimal)";
pub const BALANCE_SIGNATURE: &str = "balanceOf(uint16)";

/// A monetary value held by a merchant.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);
}

impl AddAssign<Amount> for Balance {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl SubAssign<Amount> for Balance {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

/// A strictly positive amount moved by one call.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, HandlerFault> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(HandlerFault::message("amount must be positive"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = HandlerFault;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantAccount {
    pub merchant: u16,
    pub available: Balance,
}

impl MerchantAccount {
    pub fn new(merchant: u16) -> Self {
        Self {
            merchant,
            available: Balance::ZERO,
        }
    }

    pub fn deposit(&mut self, amount: Amount) {
        self.available += amount;
    }

    pub fn withdraw(&mut self, amount: Amount) -> Result<(), HandlerFault> {
        if self.available.0 >= amount.value() {
            self.available -= amount;
            Ok(())
        } else {
            Err(HandlerFault::message("insufficient funds"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub merchant: u16,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceQuery {
    pub merchant: u16,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PaymentsModule;

impl PaymentsModule {
    pub fn selectors() -> Vec<Selector> {
        [DEPOSIT_SIGNATURE, WITHDRAW_SIGNATURE, BALANCE_SIGNATURE]
            .iter()
            .map(|sig| Selector::from_signature(sig))
            .collect()
    }

    pub fn account_key(merchant: u16) -> String {
        format!("payments/merchant/{merchant}")
    }

    fn load(state: &SharedState, merchant: u16) -> Result<MerchantAccount, HandlerFault> {
        state
            .get(&Self::account_key(merchant))
            .map_err(|e| HandlerFault::message(format!("corrupt account: {e}")))
            .map(|account| account.unwrap_or_else(|| MerchantAccount::new(merchant)))
    }

    fn store(state: &mut SharedState, account: &MerchantAccount) -> Result<(), HandlerFault> {
        state
            .put(Self::account_key(account.merchant), account)
            .map_err(|e| HandlerFault::message(e.to_string()))
    }

    fn encode(account: &MerchantAccount) -> Result<Vec<u8>, HandlerFault> {
        serde_json::to_vec(account).map_err(|e| HandlerFault::message(e.to_string()))
    }
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, HandlerFault> {
    serde_json::from_slice(body).map_err(|e| HandlerFault::message(format!("bad payload: {e}")))
}

impl HandlerModule for PaymentsModule {
    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        input: &[u8],
    ) -> Result<Vec<u8>, HandlerFault> {
        let selector = Selector::from_calldata(input)
            .ok_or_else(|| HandlerFault::message("missing selector"))?;
        let body = &input[4..];

        if selector == Selector::from_signature(DEPOSIT_SIGNATURE) {
            let transfer: Transfer = decode(body)?;
            let mut account = Self::load(ctx.shared(), transfer.merchant)?;
            account.deposit(transfer.amount);
            Self::store(ctx.shared_mut(), &account)?;
            Self::encode(&account)
        } else if selector == Selector::from_signature(WITHDRAW_SIGNATURE) {
            let transfer: Transfer = decode(body)?;
            let mut account = Self::load(ctx.shared(), transfer.merchant)?;
            account.withdraw(transfer.amount)?;
            Self::store(ctx.shared_mut(), &account)?;
            Self::encode(&account)
        } else if selector == Selector::from_signature(BALANCE_SIGNATURE) {
            let query: BalanceQuery = decode(body)?;
            let account = Self::load(ctx.shared(), query.merchant)?;
            Self::encode(&account)
        } else {
            Err(HandlerFault::message(format!(
                "payments module does not implement {selector}"
            )))
        }
    }
}
