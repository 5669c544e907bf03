//! Auto-reply Module
//!
//! Polls monitored accounts for unseen direct messages and answers the ones
//! that meet the account's conditions with a template or a generated reply.

pub mod conditions;
pub mod config;
pub mod resolver;
pub mod scheduler;

pub use conditions::{should_reply, unknown_condition_kinds};
pub use config::{AccountReplyConfig, ConditionKind, ReplyConfigError};
pub use resolver::{TemplateResolver, AI_TEMPLATE_PREFIX};
pub use scheduler::{
    AccountReport, AutoReplyScheduler, PollOutcome, SchedulerSettings, TickReport,
    DEFAULT_TICK_INTERVAL,
};
