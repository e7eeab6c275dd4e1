//! MEV pattern detectors.
//!
//! Sandwich detection needs neighbouring transactions and is asynchronous;
//! arbitrage classification is a pure function of one transaction's data;
//! bot profiling is advisory metadata about a sandwich attacker.

pub mod arbitrage;
pub mod bot_profile;
pub mod sandwich;

pub use arbitrage::{detect_arbitrage, ArbitrageKind, ArbitragePattern};
pub use bot_profile::{profile_bot, MevBotProfile};
pub use sandwich::{DetectionMethod, SandwichDetector, SandwichMatch, SandwichRole, SandwichTransaction};
