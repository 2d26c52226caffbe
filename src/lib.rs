pub mod error;
pub mod menu_index;
pub mod resolver;
pub mod columns;
pub mod config;
pub mod pipeline;

pub use error::{Result, TrigMapError};
pub use menu_index::{strip_version, DuplicatePolicy, LogicalNameTable, MenuIndex, TriggerInfo, HLT_PREFIX};
pub use resolver::{CandidateObject, Kinematics, MenuSnapshot, ResolvedEvent, TriggerObjectAnnotation, TriggerResolver};
pub use columns::{TriggerColumns, TriggerInfoTable};
pub use config::{Config, ConfigManager, TriggerConfig};
pub use pipeline::{EventLoop, EventRecord, OutputRecord, RunStats};
