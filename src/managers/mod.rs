pub mod pick_manager;
pub mod rule_manager;
pub mod settlement_manager;

pub use pick_manager::{create_shared_pick_manager, PickStatus, SharedPickManager};
pub use rule_manager::{create_shared_rule_manager, SharedRuleManager};
pub use settlement_manager::{
    create_shared_settlement_manager, spawn_settlement_task, SettlementReport, SharedSettlementManager,
};
