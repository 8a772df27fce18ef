//! The dataflow graph: slots, links, modules and the flow that owns them.
pub mod error;
pub mod flow;
pub mod info;
pub mod link;
pub mod listeners;
pub mod module;
pub mod slot;
pub mod value;

pub use error::{FlowError, ModuleError, SlotDirection};
pub use flow::{Flow, FlowId, FlowListener};
pub use info::{ModuleInfo, SlotInfo};
pub use link::{Link, LinkId, SlotAddress};
pub use listeners::ListenerList;
pub use module::{Module, ModuleId};
pub use slot::{InputSlot, OutputSlot, Slot, SlotCore};
pub use value::Value;
