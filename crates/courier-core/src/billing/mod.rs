//! Prepaid billing ledger

mod ledger;

pub use ledger::{
    plan_funding, BillingLedger, FundingPlan, LedgerError, MessageFunding, RechargeBalance,
    RechargeDraw,
};
