//! License key lifecycle.

pub mod lifecycle;

pub use lifecycle::{
    DeleteBlock, Grant, RedeemError, Redemption, check_deletable, make_unlimited,
    orphaned_codes, redeem,
};
