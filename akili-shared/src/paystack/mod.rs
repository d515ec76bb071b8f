/// Paystack payment gateway
///
/// - `client`: outbound initialize/verify calls
/// - `signature`: HMAC-SHA512 webhook signature check
/// - `tiers`: amount-to-credit mapping
/// - `settle`: idempotent crediting of a successful payment

pub mod client;
pub mod settle;
pub mod signature;
pub mod tiers;

pub use client::{Checkout, PaystackClient, PaystackError, VerifiedTransaction};
pub use settle::{settle_payment, Settlement};
pub use signature::{sign_payload, verify_signature, SIGNATURE_HEADER};
pub use tiers::credits_for_amount;
